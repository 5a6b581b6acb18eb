//! Challenge definitions and their validation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of cells in every challenge grid
pub const GRID_SIZE: usize = 9;

/// Labels a depleted cell may be replaced with
pub const DECOY_CATEGORIES: [&str; 12] = [
    "tree", "house", "dog", "bird", "flower", "mountain", "building", "cat", "beach", "sunset",
    "forest", "river",
];

/// Difficulty tier shown on the challenge badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Extreme => write!(f, "extreme"),
        }
    }
}

/// How a grid challenge is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Select exactly the target cells, then verify
    #[default]
    FixedSelection,
    /// Each selected target is replaced by a decoy until none remain
    DepleteUntilNone,
}

/// One immutable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDefinition {
    pub title: String,
    /// Label that satisfies the title's criterion
    pub target_category: String,
    /// Cell labels in grid order
    pub categories: Vec<String>,
    /// Cells whose label is the target category
    pub targets: Vec<usize>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub mode: ResolutionMode,
}

/// Reasons a challenge definition is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog contains no challenges")]
    Empty,

    #[error("challenge has an empty title")]
    EmptyTitle,

    #[error("challenge {title:?} has {len} cells, expected {GRID_SIZE}")]
    GridSize { title: String, len: usize },

    #[error("challenge {title:?} has no target cells")]
    NoTargets { title: String },

    #[error("challenge {title:?} targets cell {index}, outside the grid")]
    TargetOutOfRange { title: String, index: usize },

    #[error("challenge {title:?} lists target cell {index} twice")]
    DuplicateTarget { title: String, index: usize },

    #[error("challenge {title:?} cell {index} label disagrees with the target set")]
    CategoryMismatch { title: String, index: usize },
}

impl ChallengeDefinition {
    /// Check the structural invariants of a definition
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }
        let title = || self.title.clone();

        if self.categories.len() != GRID_SIZE {
            return Err(CatalogError::GridSize {
                title: title(),
                len: self.categories.len(),
            });
        }
        if self.targets.is_empty() {
            return Err(CatalogError::NoTargets { title: title() });
        }

        let mut seen = HashSet::new();
        for &index in &self.targets {
            if index >= GRID_SIZE {
                return Err(CatalogError::TargetOutOfRange {
                    title: title(),
                    index,
                });
            }
            if !seen.insert(index) {
                return Err(CatalogError::DuplicateTarget {
                    title: title(),
                    index,
                });
            }
        }

        // Target cells carry the target label, and nothing else does
        for (index, category) in self.categories.iter().enumerate() {
            let is_target_label = *category == self.target_category;
            if is_target_label != seen.contains(&index) {
                return Err(CatalogError::CategoryMismatch {
                    title: title(),
                    index,
                });
            }
        }

        Ok(())
    }

    /// Decoy labels that cannot be mistaken for this challenge's target
    pub fn decoys(&self) -> impl Iterator<Item = &'static str> + '_ {
        DECOY_CATEGORIES
            .iter()
            .copied()
            .filter(move |c| *c != self.target_category)
    }
}
