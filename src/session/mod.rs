//! Session and analytics data model
//!
//! - `SessionState`: one open grid challenge, discarded on success or reset
//! - `AudioChallengeState`: the digit secret while audio mode is active
//! - `AnalyticsState`: running statistics for the widget's lifetime

mod analytics;
mod state;

pub use analytics::{AnalyticsState, DifficultyCounts};
pub use state::{
    sanitize_digits, AudioChallengeState, AudioStatus, Outcome, Playback, SessionState,
    AUDIO_DIGITS,
};
