//! Verification engine
//!
//! Pure decisions over session state. Two grid policies, picked by the
//! challenge's resolution mode, plus the exact-match audio check.

use std::collections::BTreeSet;

use crate::catalog::{ChallengeDefinition, ResolutionMode};
use crate::random::RandomSource;
use crate::session::SessionState;

/// Result of selecting a cell in a deplete-until-none challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepleteSelection {
    /// A target was removed and its cell relabelled
    Hit {
        replacement: String,
        remaining: usize,
    },
    /// Not a target; nothing changed
    Miss,
}

/// Fixed-selection policy: the selection equals the target set exactly
pub fn selection_matches(selected: &BTreeSet<usize>, targets: &[usize]) -> bool {
    selected.len() == targets.len() && targets.iter().all(|t| selected.contains(t))
}

/// Deplete policy: solved once no targets remain
pub fn is_depleted(challenge: &ChallengeDefinition) -> bool {
    challenge.targets.is_empty()
}

/// Evaluate the session's grid challenge under its own policy
pub fn verify_grid(session: &SessionState) -> bool {
    let challenge = session.challenge();
    match challenge.mode {
        ResolutionMode::FixedSelection => selection_matches(session.selected(), &challenge.targets),
        ResolutionMode::DepleteUntilNone => is_depleted(challenge),
    }
}

/// Whether a verify request would be accepted at all
pub fn can_verify_grid(session: &SessionState) -> bool {
    match session.challenge().mode {
        ResolutionMode::FixedSelection => !session.selected().is_empty(),
        ResolutionMode::DepleteUntilNone => is_depleted(session.challenge()),
    }
}

/// Audio policy: typed digits equal the secret exactly
pub fn audio_matches(input: &str, secret: &str) -> bool {
    input == secret
}

/// Select a cell of a deplete challenge.
///
/// A present target leaves the target set and its label becomes a decoy
/// drawn uniformly from the pool, never the target category itself.
pub fn deplete_select(
    challenge: &mut ChallengeDefinition,
    index: usize,
    rng: &mut dyn RandomSource,
) -> DepleteSelection {
    let Some(position) = challenge.targets.iter().position(|&t| t == index) else {
        return DepleteSelection::Miss;
    };

    let decoys: Vec<&'static str> = challenge.decoys().collect();
    let replacement = decoys[rng.pick(decoys.len())].to_string();

    challenge.targets.remove(position);
    if let Some(cell) = challenge.categories.get_mut(index) {
        *cell = replacement.clone();
    }

    DepleteSelection::Hit {
        replacement,
        remaining: challenge.targets.len(),
    }
}

/// Completion of the grid challenge, 0..=100
pub fn progress_percent(session: &SessionState) -> f64 {
    let progress = match session.challenge().mode {
        ResolutionMode::FixedSelection => {
            let targets = session.challenge().targets.len().max(1);
            session.selected().len() as f64 / targets as f64 * 100.0
        }
        ResolutionMode::DepleteUntilNone => {
            let initial = session.initial_targets().max(1);
            let cleared = initial.saturating_sub(session.remaining_targets());
            cleared as f64 / initial as f64 * 100.0
        }
    };
    progress.min(100.0)
}

/// Hint comparing what the user has done with what the grid needs
pub fn hint(session: &SessionState) -> String {
    let challenge = session.challenge();
    if challenge.mode == ResolutionMode::DepleteUntilNone {
        return match session.remaining_targets() {
            0 => "All clear! Click VERIFY to finish.".to_string(),
            n => format!("{n} matching text box(es) left. Keep selecting until none remain."),
        };
    }

    let correct = challenge.targets.len();
    let selected = session.selected().len();
    if selected == 0 {
        format!("Look for {correct} text boxes that match the description.")
    } else if selected < correct {
        format!("You need to select {} more text box(es).", correct - selected)
    } else if selected > correct {
        format!(
            "You have selected too many text boxes. Try removing {}.",
            selected - correct
        )
    } else {
        "You have the right number of selections. Click VERIFY to check!".to_string()
    }
}
