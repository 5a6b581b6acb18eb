//! Notifications the widget emits to its embedding host
//!
//! `verified` and `reset` mirror the two observable notifications of the
//! public surface; `status_changed` tracks the `status` property.

use serde::{Deserialize, Serialize};

use crate::catalog::Difficulty;

/// Externally observable verification status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "null")]
    Unverified,
    #[serde(rename = "true")]
    Verified,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unverified => "null",
            Status::Verified => "true",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the widget during transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetEvent {
    /// A challenge was solved
    Verified {
        verified: bool,
        /// Whole seconds from challenge open to verification
        #[serde(rename = "timeSpent")]
        time_spent: u64,
        /// Attempts used in the session, including the successful one
        attempts: u32,
        difficulty: Difficulty,
    },

    /// The widget returned to the unchecked state, by request or after
    /// running out of attempts
    Reset { reset: bool },

    /// The `status` property changed
    StatusChanged { status: Status },
}

impl std::fmt::Display for WidgetEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WidgetEvent::Verified {
                time_spent,
                attempts,
                difficulty,
                ..
            } => write!(
                f,
                "VERIFIED ({}s, {} attempt(s), {})",
                time_spent, attempts, difficulty
            ),
            WidgetEvent::Reset { .. } => write!(f, "RESET"),
            WidgetEvent::StatusChanged { status } => write!(f, "STATUS_CHANGED ({})", status),
        }
    }
}
