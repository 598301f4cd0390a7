//! Adapters for the external speech recognizer.

use duct::cmd;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::cue::{Segment, Transcript, WordTiming};
use super::error::PipelineError;

/// Model names the Whisper CLI knows how to download.
pub const KNOWN_MODELS: &[&str] = &[
    "tiny",
    "tiny.en",
    "base",
    "base.en",
    "small",
    "small.en",
    "medium",
    "medium.en",
    "large",
    "large-v1",
    "large-v2",
    "large-v3",
    "large-v3-turbo",
    "turbo",
];

/// Produces a word-timed transcript for a media file.
///
/// `transcribe` is a blocking call that cannot be interrupted once started.
pub trait Recognizer: Send {
    fn load_model(&mut self, model: &str) -> Result<(), PipelineError>;
    fn transcribe(&mut self, media: &Path) -> Result<Transcript, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// Parse Whisper's `--output_format json` output.
///
/// Segment order and word order are kept as-is. Segments without word
/// timings become empty segments.
pub fn parse_whisper_json(json_str: &str) -> Result<Transcript, PipelineError> {
    let output: WhisperOutput = serde_json::from_str(json_str)
        .map_err(|err| PipelineError::recognition(format!("invalid transcript JSON: {err}")))?;

    let segments = output
        .segments
        .into_iter()
        .map(|segment| {
            Segment::new(
                segment
                    .words
                    .into_iter()
                    .map(|w| WordTiming::new(w.start, w.end, w.word))
                    .collect(),
            )
        })
        .collect();

    Ok(Transcript::new(segments))
}

/// Runs the `whisper` command line tool with word timestamps enabled.
#[derive(Debug, Clone)]
pub struct WhisperCliRecognizer {
    program: String,
    model: Option<String>,
}

impl WhisperCliRecognizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: None,
        }
    }
}

impl Recognizer for WhisperCliRecognizer {
    fn load_model(&mut self, model: &str) -> Result<(), PipelineError> {
        let is_checkpoint = Path::new(model).is_file();
        if !KNOWN_MODELS.contains(&model) && !is_checkpoint {
            return Err(PipelineError::recognition(format!(
                "unknown model '{model}' (expected one of: {})",
                KNOWN_MODELS.join(", ")
            )));
        }

        which::which(&self.program).map_err(|err| {
            PipelineError::recognition(format!(
                "recognizer '{}' is not available: {err}",
                self.program
            ))
        })?;

        self.model = Some(model.to_string());
        Ok(())
    }

    fn transcribe(&mut self, media: &Path) -> Result<Transcript, PipelineError> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| PipelineError::recognition("no model loaded"))?;

        let output_dir = tempfile::Builder::new()
            .prefix("easysub-whisper")
            .tempdir()
            .map_err(|err| {
                PipelineError::recognition(format!("cannot create scratch directory: {err}"))
            })?;

        let output = cmd!(
            &self.program,
            media,
            "--model",
            &model,
            "--word_timestamps",
            "True",
            "--output_format",
            "json",
            "--output_dir",
            output_dir.path(),
            "--verbose",
            "False"
        )
        .stdout_null()
        .stderr_capture()
        .unchecked()
        .run()
        .map_err(|err| {
            PipelineError::recognition(format!("failed to run {}: {err}", self.program))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::recognition(format!(
                "{} exited with status {:?}: {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let json_path = whisper_json_path(output_dir.path(), media);
        let contents = fs::read_to_string(&json_path).map_err(|err| {
            PipelineError::recognition(format!(
                "{} did not produce {}: {err}",
                self.program,
                json_path.display()
            ))
        })?;

        parse_whisper_json(&contents)
    }
}

fn whisper_json_path(output_dir: &Path, media: &Path) -> PathBuf {
    let stem = media
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcript".to_string());
    output_dir.join(format!("{stem}.json"))
}

/// Reads a previously produced Whisper JSON transcript instead of running recognition.
#[derive(Debug, Clone)]
pub struct JsonTranscriptRecognizer {
    path: PathBuf,
}

impl JsonTranscriptRecognizer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Recognizer for JsonTranscriptRecognizer {
    fn load_model(&mut self, _model: &str) -> Result<(), PipelineError> {
        if !self.path.is_file() {
            return Err(PipelineError::recognition(format!(
                "transcript {} does not exist",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn transcribe(&mut self, _media: &Path) -> Result<Transcript, PipelineError> {
        let contents = fs::read_to_string(&self.path).map_err(|err| {
            PipelineError::recognition(format!("reading {}: {err}", self.path.display()))
        })?;
        parse_whisper_json(&contents)
    }
}
