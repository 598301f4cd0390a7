use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch media directory plus an isolated config home for one test.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        fs::create_dir_all(temp_dir.path().join("config"))?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Value for `XDG_CONFIG_HOME` so runs never touch the real config
    pub fn config_home(&self) -> PathBuf {
        self.path().join("config")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_home().join("easysub").join("subtitle.toml")
    }

    /// Create a placeholder media file; the transcript stands in for recognition
    pub fn media(&self, name: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, b"not really a video")?;
        Ok(path)
    }

    pub fn transcript(&self, name: &str, json: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, json)?;
        Ok(path)
    }
}
