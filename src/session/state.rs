//! Per-session mutable state

use std::collections::BTreeSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::catalog::ChallengeDefinition;
use crate::clock;
use crate::random::RandomSource;

/// Number of digits in an audio secret
pub const AUDIO_DIGITS: usize = 4;

/// Where the current session's verification stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing answered yet
    #[default]
    Unset,
    /// The user has started answering
    Pending,
    Success,
    Failure,
}

/// One open grid challenge
#[derive(Debug, Clone)]
pub struct SessionState {
    catalog_index: usize,
    challenge: ChallengeDefinition,
    initial_targets: usize,
    selected: BTreeSet<usize>,
    attempts: u32,
    started_at: Instant,
    outcome: Outcome,
}

impl SessionState {
    /// Open a session on a private copy of a catalog entry
    pub fn open(catalog_index: usize, definition: &ChallengeDefinition, now: Instant) -> Self {
        Self {
            catalog_index,
            initial_targets: definition.targets.len(),
            challenge: definition.clone(),
            selected: BTreeSet::new(),
            attempts: 0,
            started_at: now,
            outcome: Outcome::Unset,
        }
    }

    /// Swap in another challenge; attempts and the timer carry over
    pub fn replace_challenge(&mut self, catalog_index: usize, definition: &ChallengeDefinition) {
        self.catalog_index = catalog_index;
        self.initial_targets = definition.targets.len();
        self.challenge = definition.clone();
        self.selected.clear();
    }

    pub fn catalog_index(&self) -> usize {
        self.catalog_index
    }

    pub fn challenge(&self) -> &ChallengeDefinition {
        &self.challenge
    }

    pub(crate) fn challenge_mut(&mut self) -> &mut ChallengeDefinition {
        &mut self.challenge
    }

    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    /// Flip a cell in or out of the selection; returns whether it is now selected
    pub fn toggle(&mut self, index: usize) -> bool {
        self.mark_pending();
        if self.selected.remove(&index) {
            false
        } else {
            self.selected.insert(index);
            true
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Count a verification attempt; returns the new count
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    pub(crate) fn mark_pending(&mut self) {
        if self.outcome != Outcome::Success {
            self.outcome = Outcome::Pending;
        }
    }

    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        clock::elapsed_secs(self.started_at, now)
    }

    /// Targets still present in the grid
    pub fn remaining_targets(&self) -> usize {
        self.challenge.targets.len()
    }

    pub fn initial_targets(&self) -> usize {
        self.initial_targets
    }
}

/// Playback position of the digit sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Stopped,
    /// Next digit to play
    Playing { next: usize },
}

/// Feedback line under the audio input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioStatus {
    #[default]
    None,
    Incorrect,
}

/// Audio transcription challenge, independent of the grid challenge
#[derive(Debug, Clone)]
pub struct AudioChallengeState {
    secret: [u8; AUDIO_DIGITS],
    input: String,
    playback: Playback,
    status: AudioStatus,
}

impl AudioChallengeState {
    /// Draw a fresh secret
    pub fn generate(rng: &mut dyn RandomSource) -> Self {
        let mut secret = [0u8; AUDIO_DIGITS];
        for digit in secret.iter_mut() {
            *digit = rng.digit();
        }
        Self {
            secret,
            input: String::new(),
            playback: Playback::Stopped,
            status: AudioStatus::None,
        }
    }

    /// Secret as the string the user is expected to type
    pub fn secret_string(&self) -> String {
        self.secret.iter().map(|d| char::from(b'0' + d)).collect()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the typed text, keeping only the first four digits
    pub fn set_input(&mut self, raw: &str) {
        self.input = sanitize_digits(raw);
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.status = AudioStatus::None;
    }

    pub fn status(&self) -> AudioStatus {
        self.status
    }

    pub fn set_status(&mut self, status: AudioStatus) {
        self.status = status;
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.playback, Playback::Playing { .. })
    }

    pub fn start_playback(&mut self) {
        self.playback = Playback::Playing { next: 0 };
    }

    /// Take the next digit to play, or stop when the sequence is done
    pub fn advance_playback(&mut self) -> Option<u8> {
        match self.playback {
            Playback::Playing { next } if next < AUDIO_DIGITS => {
                self.playback = Playback::Playing { next: next + 1 };
                Some(self.secret[next])
            }
            Playback::Playing { .. } => {
                self.playback = Playback::Stopped;
                None
            }
            Playback::Stopped => None,
        }
    }
}

/// Strip everything but ASCII digits and cap the length
pub fn sanitize_digits(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(AUDIO_DIGITS)
        .collect()
}
