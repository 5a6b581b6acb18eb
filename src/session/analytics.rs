//! Running statistics over every verification attempt of a widget

use serde::{Deserialize, Serialize};

use crate::catalog::Difficulty;

/// Completed challenges per difficulty tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyCounts {
    pub easy: u64,
    pub medium: u64,
    pub hard: u64,
    pub extreme: u64,
}

impl DifficultyCounts {
    pub fn get(&self, difficulty: Difficulty) -> u64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
            Difficulty::Extreme => self.extreme,
        }
    }

    fn increment(&mut self, difficulty: Difficulty) {
        let slot = match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
            Difficulty::Extreme => &mut self.extreme,
        };
        *slot += 1;
    }
}

/// Widget-lifetime analytics; also the snapshot handed to the host.
///
/// `success_rate` and `average_time` are folded in only on success, each
/// using `(old * (n - 1) + value) / n` with `n` the total attempt count.
/// With failures in the mix this is not the ratio of successes to attempts;
/// the host-visible numbers depend on exactly this update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsState {
    pub total_attempts: u64,
    /// Percentage
    pub success_rate: f64,
    /// Seconds
    pub average_time: f64,
    pub difficulty_counts: DifficultyCounts,
}

impl AnalyticsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one verification attempt, whatever its outcome
    pub fn record_attempt(&mut self) {
        self.total_attempts += 1;
    }

    /// Fold a successful completion into the running means
    pub fn record_success(&mut self, time_spent_secs: u64, difficulty: Difficulty) {
        self.difficulty_counts.increment(difficulty);

        let n = self.total_attempts.max(1) as f64;
        self.average_time = (self.average_time * (n - 1.0) + time_spent_secs as f64) / n;
        self.success_rate = (self.success_rate * (n - 1.0) + 100.0) / n;
    }

    /// One-line summary shown under the challenge grid
    pub fn summary(&self) -> String {
        format!(
            "Success Rate: {}% | Avg Time: {}s",
            self.success_rate.round(),
            self.average_time.round()
        )
    }
}
