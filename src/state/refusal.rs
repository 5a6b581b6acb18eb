//! Reasons the widget declines a request
//!
//! A refusal never changes state.

use thiserror::Error;

use super::State;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("already verified; reset first")]
    AlreadyVerified,

    #[error("not available while {0}")]
    WrongState(State),

    #[error("{0} challenges are disabled by configuration")]
    ModeDisabled(&'static str),

    #[error("audio playback is in progress")]
    PlaybackInProgress,

    #[error("cell {0} is outside the grid")]
    OutOfRange(usize),

    #[error("nothing to verify yet")]
    NothingToVerify,
}

impl Refusal {
    /// Stable identifier for IPC clients
    pub fn code(&self) -> &'static str {
        match self {
            Refusal::AlreadyVerified => "already_verified",
            Refusal::WrongState(_) => "wrong_state",
            Refusal::ModeDisabled(_) => "mode_disabled",
            Refusal::PlaybackInProgress => "playback_in_progress",
            Refusal::OutOfRange(_) => "out_of_range",
            Refusal::NothingToVerify => "nothing_to_verify",
        }
    }
}
