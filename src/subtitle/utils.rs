use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize path {}", path.display()))
}

/// Absolute form of an output path whose file may not exist yet.
///
/// The parent directory must exist; it is canonicalized so the result can be
/// compared against canonicalized inputs.
pub fn resolve_output_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .with_context(|| format!("{} does not name a file", path.display()))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(canonicalize_existing(parent)?.join(file_name))
}

fn media_stem(media: &Path) -> String {
    media
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles".to_string())
}

/// `<stem>.srt` next to the media file.
pub fn default_subtitle_path(media: &Path) -> PathBuf {
    media.with_file_name(format!("{}.srt", media_stem(media)))
}

/// `<stem>_subbed.mp4` next to the media file.
pub fn default_video_path(media: &Path) -> PathBuf {
    media.with_file_name(format!("{}_subbed.mp4", media_stem(media)))
}
