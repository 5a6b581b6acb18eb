//! Challenge catalog
//!
//! A validated, read-only list of grid challenges. Sessions draw from it
//! by index and work on their own copy of the drawn entry.

mod definition;

pub use definition::{
    CatalogError, ChallengeDefinition, Difficulty, ResolutionMode, DECOY_CATEGORIES, GRID_SIZE,
};

use crate::random::RandomSource;

/// The set of challenges a widget can draw from
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ChallengeDefinition>,
}

impl Catalog {
    /// Build a catalog, rejecting it if any entry is malformed
    pub fn new(entries: Vec<ChallengeDefinition>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self { entries })
    }

    /// The eight challenges shipped with the widget
    pub fn builtin() -> Self {
        Self {
            entries: builtin_entries(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChallengeDefinition> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[ChallengeDefinition] {
        &self.entries
    }

    /// Uniform draw over all entries
    pub fn draw(&self, rng: &mut dyn RandomSource) -> usize {
        rng.pick(self.entries.len())
    }

    /// Uniform draw over every entry except `current`, when another exists
    pub fn draw_other(&self, current: usize, rng: &mut dyn RandomSource) -> usize {
        if self.entries.len() < 2 {
            return self.draw(rng);
        }
        let index = rng.pick(self.entries.len() - 1);
        if index >= current {
            index + 1
        } else {
            index
        }
    }
}

fn entry(
    title: &str,
    target: &str,
    categories: [&str; GRID_SIZE],
    difficulty: Difficulty,
    mode: ResolutionMode,
) -> ChallengeDefinition {
    let targets = categories
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == target)
        .map(|(i, _)| i)
        .collect();
    ChallengeDefinition {
        title: title.to_string(),
        target_category: target.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        targets,
        difficulty,
        mode,
    }
}

fn builtin_entries() -> Vec<ChallengeDefinition> {
    use Difficulty::*;
    use ResolutionMode::*;

    vec![
        entry(
            "Select all text boxes with cars",
            "car",
            ["car", "tree", "car", "house", "dog", "car", "bird", "flower", "mountain"],
            Easy,
            FixedSelection,
        ),
        entry(
            "Select all text boxes with traffic lights",
            "traffic light",
            [
                "building", "traffic light", "cat", "beach", "traffic light", "sunset", "forest",
                "traffic light", "river",
            ],
            Medium,
            FixedSelection,
        ),
        entry(
            "Select all text boxes with bicycles",
            "bicycle",
            [
                "bicycle", "flower", "mountain", "bicycle", "tree", "house", "dog", "bird",
                "bicycle",
            ],
            Easy,
            FixedSelection,
        ),
        entry(
            "Select all text boxes with crosswalks",
            "crosswalk",
            [
                "car", "tree", "crosswalk", "house", "crosswalk", "dog", "crosswalk", "bird",
                "crosswalk",
            ],
            Hard,
            FixedSelection,
        ),
        entry(
            "Select all text boxes with fire hydrants",
            "fire hydrant",
            [
                "building", "fire hydrant", "cat", "beach", "sunset", "fire hydrant", "forest",
                "fire hydrant", "river",
            ],
            Medium,
            FixedSelection,
        ),
        entry(
            "Select all text boxes with motorcycles",
            "motorcycle",
            [
                "motorcycle", "flower", "mountain", "tree", "motorcycle", "house", "motorcycle",
                "bird", "dog",
            ],
            Hard,
            FixedSelection,
        ),
        entry(
            "Select all text boxes with cars until none left",
            "car",
            ["car", "tree", "car", "house", "dog", "car", "bird", "flower", "mountain"],
            Extreme,
            DepleteUntilNone,
        ),
        entry(
            "Select all text boxes with traffic lights until none left",
            "traffic light",
            [
                "building", "traffic light", "cat", "beach", "traffic light", "sunset", "forest",
                "traffic light", "river",
            ],
            Extreme,
            DepleteUntilNone,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, SeededRandom};

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 8);
        assert!(Catalog::new(catalog.entries().to_vec()).is_ok());
    }

    #[test]
    fn test_builtin_targets() {
        let catalog = Catalog::builtin();
        let targets: Vec<Vec<usize>> = catalog.entries().iter().map(|e| e.targets.clone()).collect();
        assert_eq!(targets[0], vec![0, 2, 5]);
        assert_eq!(targets[1], vec![1, 4, 7]);
        assert_eq!(targets[3], vec![2, 4, 6, 8]);
        assert_eq!(catalog.get(6).map(|e| e.mode), Some(ResolutionMode::DepleteUntilNone));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert_eq!(Catalog::new(Vec::new()).unwrap_err(), CatalogError::Empty);
    }

    #[test]
    fn test_draw_other_never_repeats() {
        let catalog = Catalog::builtin();
        let mut rng = SeededRandom::new(3);
        for current in 0..catalog.len() {
            for _ in 0..50 {
                let next = catalog.draw_other(current, &mut rng);
                assert_ne!(next, current);
                assert!(next < catalog.len());
            }
        }
    }

    #[test]
    fn test_draw_other_skips_current() {
        let catalog = Catalog::builtin();
        let mut rng = ScriptedRandom::new([2, 1]);
        assert_eq!(catalog.draw_other(2, &mut rng), 3);
        assert_eq!(catalog.draw_other(2, &mut rng), 1);
    }

    #[test]
    fn test_single_entry_redraws_itself() {
        let only = Catalog::builtin().get(0).cloned().unwrap();
        let catalog = Catalog::new(vec![only]).unwrap();
        let mut rng = ScriptedRandom::new([5]);
        assert_eq!(catalog.draw_other(0, &mut rng), 0);
    }
}
