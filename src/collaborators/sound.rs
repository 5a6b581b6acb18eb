//! Sound and speech collaborator

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Short feedback tones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Success,
    Error,
    Click,
    Refresh,
    Hint,
}

impl Cue {
    /// Pitch of the tone
    pub fn frequency_hz(&self) -> u32 {
        match self {
            Cue::Success => 523,
            Cue::Error => 220,
            Cue::Click => 330,
            Cue::Refresh => 440,
            Cue::Hint => 660,
        }
    }
}

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("no audio asset for digit {0}")]
    AssetMissing(u8),
}

/// Plays cues and spoken digits
pub trait SoundPlayer: Send {
    fn play_cue(&mut self, cue: Cue);

    /// Play a recorded digit; returns once it finished or failed
    fn play_digit(&mut self, digit: u8) -> Result<(), SoundError>;

    /// Synthesised fallback for a digit
    fn speak(&mut self, digit: u8);
}

/// Host player: digits come from `<dir>/<digit>.mp3`, output is logged
#[derive(Debug, Clone, Default)]
pub struct AssetSoundPlayer {
    sounds_dir: Option<PathBuf>,
}

impl AssetSoundPlayer {
    pub fn new(sounds_dir: Option<PathBuf>) -> Self {
        Self { sounds_dir }
    }
}

impl SoundPlayer for AssetSoundPlayer {
    fn play_cue(&mut self, cue: Cue) {
        debug!(?cue, frequency_hz = cue.frequency_hz(), "cue");
    }

    fn play_digit(&mut self, digit: u8) -> Result<(), SoundError> {
        let path = self
            .sounds_dir
            .as_ref()
            .map(|dir| dir.join(format!("{digit}.mp3")))
            .filter(|path| path.is_file())
            .ok_or(SoundError::AssetMissing(digit))?;
        info!(path = %path.display(), "playing digit");
        Ok(())
    }

    fn speak(&mut self, digit: u8) {
        info!(digit, "speaking digit");
    }
}

/// Everything a `RecordingSound` was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCall {
    Cue(Cue),
    Digit(u8),
    Spoken(u8),
}

/// Test double that records calls; clones share the log.
///
/// Digits listed in `failing` report an asset error.
#[derive(Debug, Clone, Default)]
pub struct RecordingSound {
    calls: Arc<Mutex<Vec<SoundCall>>>,
    failing: Vec<u8>,
}

impl RecordingSound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_digits(mut self, digits: impl IntoIterator<Item = u8>) -> Self {
        self.failing = digits.into_iter().collect();
        self
    }

    pub fn calls(&self) -> Vec<SoundCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SoundCall::Cue(cue) => Some(cue),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: SoundCall) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }
}

impl SoundPlayer for RecordingSound {
    fn play_cue(&mut self, cue: Cue) {
        self.push(SoundCall::Cue(cue));
    }

    fn play_digit(&mut self, digit: u8) -> Result<(), SoundError> {
        if self.failing.contains(&digit) {
            return Err(SoundError::AssetMissing(digit));
        }
        self.push(SoundCall::Digit(digit));
        Ok(())
    }

    fn speak(&mut self, digit: u8) {
        self.push(SoundCall::Spoken(digit));
    }
}
