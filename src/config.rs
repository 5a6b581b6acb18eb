//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of verification attempts per session
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Which challenge modes a widget may show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ChallengeType {
    Visual,
    Audio,
    #[default]
    Both,
}

impl ChallengeType {
    pub fn allows_audio(&self) -> bool {
        !matches!(self, ChallengeType::Visual)
    }

    pub fn allows_visual(&self) -> bool {
        !matches!(self, ChallengeType::Audio)
    }
}

/// Unknown values fall back to `Both`
impl From<&str> for ChallengeType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "visual" => ChallengeType::Visual,
            "audio" => ChallengeType::Audio,
            _ => ChallengeType::Both,
        }
    }
}

impl From<String> for ChallengeType {
    fn from(value: String) -> Self {
        ChallengeType::from(value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("maxAttempts must be at least 1")]
    ZeroAttempts,

    #[error("{name}={value:?} is not a valid number")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name}={value:?} is not true or false")]
    InvalidBool { name: &'static str, value: String },
}

/// The options the widget itself recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetOptions {
    pub challenge_type: ChallengeType,
    pub sound_enabled: bool,
    pub dark_mode: bool,
    pub max_attempts: u32,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            challenge_type: ChallengeType::Both,
            sound_enabled: true,
            dark_mode: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Reachable challenge modes
    #[serde(rename = "type", default)]
    pub challenge_type: ChallengeType,

    #[serde(default = "default_true")]
    pub sound_enabled: bool,

    #[serde(default)]
    pub dark_mode: bool,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Path to the Unix domain socket for IPC
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Directory for runtime data (saved preferences)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding `0.mp3` .. `9.mp3`
    #[serde(default)]
    pub sounds_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const SOCKET_FILE: &str = "widget.sock";

fn data_dir_in(home: &Path) -> PathBuf {
    home.join(".local").join("share").join("captcha-widget")
}

/// `$HOME/.local/share/captcha-widget`, relative when HOME is unset
fn default_data_dir() -> PathBuf {
    data_dir_in(Path::new(&std::env::var_os("HOME").unwrap_or_default()))
}

fn default_socket_path() -> PathBuf {
    default_data_dir().join(SOCKET_FILE)
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    value
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| ConfigError::InvalidBool { name, value })
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let mut config = Self::with_data_dir(data_dir_in(Path::new(&home)));
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let options = WidgetOptions::default();
        Self {
            challenge_type: options.challenge_type,
            sound_enabled: options.sound_enabled,
            dark_mode: options.dark_mode,
            max_attempts: options.max_attempts,
            socket_path: data_dir.join(SOCKET_FILE),
            sounds_dir: None,
            data_dir,
        }
    }

    /// Parse an explicit options object; omitted paths use the HOME defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CAPTCHA_*` overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CAPTCHA_TYPE") {
            self.challenge_type = ChallengeType::from(value);
        }
        if let Some(value) = lookup("CAPTCHA_MAX_ATTEMPTS") {
            self.max_attempts = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "CAPTCHA_MAX_ATTEMPTS",
                    value,
                })?;
        }
        if let Some(value) = lookup("CAPTCHA_SOUND_ENABLED") {
            self.sound_enabled = parse_bool("CAPTCHA_SOUND_ENABLED", value)?;
        }
        if let Some(value) = lookup("CAPTCHA_DARK_MODE") {
            self.dark_mode = parse_bool("CAPTCHA_DARK_MODE", value)?;
        }
        if let Some(value) = lookup("CAPTCHA_SOCKET") {
            self.socket_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("CAPTCHA_SOUNDS_DIR") {
            self.sounds_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }

    /// Options handed to the widget
    pub fn widget_options(&self) -> WidgetOptions {
        WidgetOptions {
            challenge_type: self.challenge_type,
            sound_enabled: self.sound_enabled,
            dark_mode: self.dark_mode,
            max_attempts: self.max_attempts,
        }
    }

    /// Where preferences are persisted
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
