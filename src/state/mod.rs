//! Mode controller
//!
//! Explicit state machine with five states:
//! - Idle: checkbox unchecked, unverified
//! - Loading: synthetic delay after checking the box
//! - ChallengeVisual: grid challenge showing
//! - ChallengeAudio: digit transcription showing
//! - Verified: terminal until reset

mod machine;
mod refusal;
mod timer;

pub use machine::{ChallengeWidget, State};
pub use refusal::Refusal;
pub use timer::{
    ScheduledTimer, TimerKind, AUDIO_CLEAR_DELAY, DIGIT_GAP, HINT_DURATION, LOADING_DELAY,
    PLAYBACK_LEAD_IN, SUCCESS_BANNER_DURATION,
};
