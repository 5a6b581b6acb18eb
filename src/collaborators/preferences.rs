//! Preference persistence

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-facing toggles that survive restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default = "default_sound")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub dark_mode: bool,
}

fn default_sound() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            dark_mode: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored preferences are malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Opaque key-value persistence for `Preferences`
pub trait PreferenceStore: Send {
    /// `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<Preferences>, PreferenceError>;

    fn save(&mut self, preferences: &Preferences) -> Result<(), PreferenceError>;
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<Preferences>, PreferenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&mut self, preferences: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec(preferences)?)?;
        Ok(())
    }
}

/// In-memory store; clones share contents
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    saved: Arc<Mutex<Option<Preferences>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(preferences: Preferences) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Some(preferences))),
        }
    }

    pub fn saved(&self) -> Option<Preferences> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<Preferences>, PreferenceError> {
        Ok(self.saved())
    }

    fn save(&mut self, preferences: &Preferences) -> Result<(), PreferenceError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(*preferences);
        Ok(())
    }
}
