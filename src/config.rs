use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::clock::DEFAULT_TIME_LIMIT_SECS;
use crate::error::TutorError;
use crate::session::{SessionConfig, DEFAULT_LOOKAHEAD};
use crate::word_source::WordSource;

/// User preferences remembered between runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub time_limit_secs: u64,
    pub lookahead: usize,
    pub word_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            lookahead: DEFAULT_LOOKAHEAD,
            word_file: None,
        }
    }
}

impl Settings {
    /// The remembered word file, or the built-in list when none is set
    pub fn vocabulary(&self) -> Result<WordSource, TutorError> {
        match &self.word_file {
            Some(path) => WordSource::from_file(path),
            None => Ok(WordSource::default()),
        }
    }

    pub fn session_config(&self, vocabulary: WordSource) -> Result<SessionConfig, TutorError> {
        SessionConfig::new(self.time_limit_secs, self.lookahead, vocabulary)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("typetutor_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Settings {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Settings>(&bytes) {
                Ok(settings) => return settings,
                Err(err) => warn!(path = %self.path.display(), %err, "settings_unreadable"),
            }
        }
        Settings::default()
    }

    fn save(&self, settings: &Settings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, data)
    }
}
