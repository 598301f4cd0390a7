use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::common::paths;

use super::cue::{CueMode, RepairPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Recognition model identifier passed to the recognizer
    pub model: String,
    /// Cue grouping used when no `--mode` is given
    pub mode: CueMode,
    /// Maximum words per cue in phrase mode
    pub max_words: usize,
    /// Minimum duration (seconds) given to a zero-length word cue
    pub word_min_duration: f64,
    /// Minimum duration (seconds) given to a zero-length phrase cue
    pub phrase_min_duration: f64,
    /// Speech recognizer executable
    pub recognizer_program: String,
    /// Media renderer executable
    pub renderer_program: String,
    /// How often the renderer child is polled
    pub poll_interval_ms: u64,
    /// How long a terminated renderer gets before it is killed
    pub cancel_grace_ms: u64,
    /// Maximum number of characters of renderer diagnostics kept in an error
    pub diagnostic_cap: usize,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            mode: CueMode::default(),
            max_words: Self::DEFAULT_MAX_WORDS,
            word_min_duration: RepairPolicy::DEFAULT_WORD_MIN_DURATION,
            phrase_min_duration: RepairPolicy::DEFAULT_PHRASE_MIN_DURATION,
            recognizer_program: "whisper".to_string(),
            renderer_program: "ffmpeg".to_string(),
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            cancel_grace_ms: Self::DEFAULT_CANCEL_GRACE_MS,
            diagnostic_cap: Self::DEFAULT_DIAGNOSTIC_CAP,
        }
    }
}

impl SubtitleConfig {
    pub const DEFAULT_MODEL: &'static str = "small";
    pub const DEFAULT_MAX_WORDS: usize = 5;
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
    pub const DEFAULT_CANCEL_GRACE_MS: u64 = 1000;
    pub const DEFAULT_DIAGNOSTIC_CAP: usize = 2000;

    pub fn load() -> Result<Self> {
        Self::load_from_path(paths::subtitle_config_path()?)
    }

    /// Load the config at `path`, writing the defaults there first if it does not exist.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading subtitle config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents).context("parsing subtitle config")?;
        Ok(config.sanitized())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("creating subtitle config directory {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("serializing subtitle config")?;
        fs::write(path, toml)
            .with_context(|| format!("writing subtitle config to {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing subtitle config")
    }

    /// Replace out-of-range values with their defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_words == 0 {
            self.max_words = defaults.max_words;
        }
        if !is_positive(self.word_min_duration) {
            self.word_min_duration = defaults.word_min_duration;
        }
        if !is_positive(self.phrase_min_duration) {
            self.phrase_min_duration = defaults.phrase_min_duration;
        }
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = defaults.poll_interval_ms;
        }
        if self.diagnostic_cap == 0 {
            self.diagnostic_cap = defaults.diagnostic_cap;
        }
        if self.model.trim().is_empty() {
            self.model = defaults.model;
        }
        if self.recognizer_program.trim().is_empty() {
            self.recognizer_program = defaults.recognizer_program;
        }
        if self.renderer_program.trim().is_empty() {
            self.renderer_program = defaults.renderer_program;
        }
        self
    }

    pub fn repair_policy(&self) -> RepairPolicy {
        RepairPolicy {
            word_min_duration: self.word_min_duration,
            phrase_min_duration: self.phrase_min_duration,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
