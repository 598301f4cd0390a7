use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use super::cue::CueMode;

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Source video or audio file
    #[arg(value_hint = ValueHint::FilePath)]
    pub media: PathBuf,

    /// Subtitle file to write; defaults to <medianame>.srt next to the media
    #[arg(long = "srt-out", value_hint = ValueHint::FilePath)]
    pub srt_out: Option<PathBuf>,

    /// Rendered video path; defaults to <medianame>_subbed.mp4 next to the media
    #[arg(long = "video-out", value_hint = ValueHint::FilePath)]
    pub video_out: Option<PathBuf>,

    /// Cue grouping (word or phrase); overrides the configured mode
    #[arg(short, long, value_enum)]
    pub mode: Option<CueMode>,

    /// Maximum words per phrase cue
    #[arg(long)]
    pub max_words: Option<usize>,

    /// Recognition model override (e.g. tiny, small, medium)
    #[arg(long)]
    pub model: Option<String>,

    /// Also burn the subtitles into a copy of the video
    #[arg(long)]
    pub render: bool,

    /// Use an existing Whisper JSON transcript instead of running recognition
    #[arg(short = 't', long = "transcript", value_hint = ValueHint::FilePath)]
    pub transcript: Option<PathBuf>,

    /// Overwrite an existing subtitle file
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the active subtitle configuration
    Show,
    /// Print the location of the configuration file
    Path,
}
