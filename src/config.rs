//! # Configuration Module
//!
//! Runtime settings for moodplay, read from a JSON file in the platform
//! config directory:
//!
//! - Linux: `~/.config/moodplay/config.json`
//! - macOS: `~/Library/Application Support/moodplay/config.json`
//! - Windows: `%APPDATA%\moodplay\config.json`
//!
//! A missing file means defaults. Every field is optional, so a file only
//! needs the values it changes:
//!
//! ```json
//! { "songs_dir": "/home/me/Music/moods", "poll_interval_ms": 4000 }
//! ```
//!
//! API keys never live in this file. They come from the environment, with
//! a `.env` file in the working directory loaded first.

use anyhow::{Context, Result};
use log::{debug, info};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::poller::PollerSettings;
use crate::speech::ListenSettings;

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const SPEECH_KEY_VAR: &str = "MOODPLAY_SPEECH_API_KEY";

/// Settings file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Flat folder of mood-named audio files.
    pub songs_dir: PathBuf,
    pub initial_volume: f32,
    pub model: String,
    /// OpenAI-compatible base URL, without `/chat/completions`.
    pub api_base: String,
    pub poll_interval_ms: u64,
    pub poll_increment_ms: u64,
    pub request_timeout_secs: u64,
    pub calibration_ms: u64,
    pub listen_timeout_secs: u64,
    pub phrase_limit_secs: u64,
    pub speech_language: String,
    /// Input device name; `None` uses the system default.
    pub input_device: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            songs_dir: PathBuf::from("songs"),
            initial_volume: 0.5,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval_ms: 2500,
            poll_increment_ms: 500,
            request_timeout_secs: 30,
            calibration_ms: 1000,
            listen_timeout_secs: 5,
            phrase_limit_secs: 10,
            speech_language: "en-US".to_string(),
            input_device: None,
        }
    }
}

impl Settings {
    /// Load from `path`, or from [`default_config_path`] when `None`.
    ///
    /// # Errors
    ///
    /// Fails if an explicitly given file is missing, or if any file that
    /// exists cannot be read or is not valid JSON. A missing default file
    /// is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(settings)
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, songs_dir: Option<PathBuf>, volume: Option<f32>) -> Self {
        if let Some(dir) = songs_dir {
            self.songs_dir = dir;
        }
        if let Some(volume) = volume {
            self.initial_volume = volume;
        }
        self.initial_volume = self.initial_volume.clamp(0.0, 1.0);
        self
    }

    /// Songs directory as an absolute path, relative ones resolved against
    /// the working directory.
    ///
    /// # Errors
    ///
    /// Fails if the working directory cannot be determined.
    pub fn resolved_songs_dir(&self) -> Result<PathBuf> {
        let absolute = self
            .songs_dir
            .absolutize()
            .with_context(|| format!("Failed to resolve {}", self.songs_dir.display()))?;
        Ok(absolute.into_owned())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            increment: Duration::from_millis(self.poll_increment_ms.max(1)),
        }
    }

    #[must_use]
    pub fn listen_settings(&self) -> ListenSettings {
        ListenSettings {
            calibration: Duration::from_millis(self.calibration_ms),
            timeout: Duration::from_secs(self.listen_timeout_secs),
            phrase_limit: Duration::from_secs(self.phrase_limit_secs),
        }
    }
}

/// `<config dir>/moodplay/config.json`, if the platform has a config dir.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("moodplay").join("config.json"))
}

/// API keys read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub openai: Option<String>,
    pub speech: Option<String>,
}

/// Load `.env` from the working directory or a parent into the process
/// environment. Variables that are already set win.
///
/// Call before parsing arguments so clap's `env` fallbacks see the file.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {e}"),
    }
}

impl Credentials {
    /// Read the key variables. Missing keys are left as `None`; they only
    /// matter once a request is made.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            openai: non_empty_var(OPENAI_KEY_VAR),
            speech: non_empty_var(SPEECH_KEY_VAR),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.songs_dir, PathBuf::from("songs"));
        assert_eq!(settings.initial_volume, 0.5);
        assert_eq!(settings.model, "gpt-3.5-turbo");
        assert_eq!(settings.poller_settings(), PollerSettings::default());
        assert_eq!(settings.listen_settings(), ListenSettings::default());
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "songs_dir": "/srv/music", "poll_interval_ms": 4000 }"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.songs_dir, PathBuf::from("/srv/music"));
        assert_eq!(settings.poll_interval_ms, 4000);
        assert_eq!(settings.poll_increment_ms, 500);
        assert_eq!(settings.speech_language, "en-US");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ songs_dir: ").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn test_overrides_clamp_volume() {
        let settings = Settings::default().with_overrides(Some(PathBuf::from("mine")), Some(3.0));
        assert_eq!(settings.songs_dir, PathBuf::from("mine"));
        assert_eq!(settings.initial_volume, 1.0);
    }

    #[test]
    fn test_relative_songs_dir_becomes_absolute() {
        let resolved = Settings::default().resolved_songs_dir().unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("songs"));
    }

    #[test]
    fn test_default_config_path_shape() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("moodplay/config.json"));
        }
    }
}
