//! How the generator moves from one level to the next

use serde::{Deserialize, Serialize};

use crate::core::Randomizer;
use super::level::Level;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelIteration {
    /// Advance through the levels once, then report depletion
    #[default]
    OrderedFinite,
    /// Advance and stay on the last level
    OrderedClamp,
    /// Advance and wrap back to the first level
    OrderedLoop,
    Random,
    SingleRepeat,
    /// Stay on the starting level and report depletion when it is done
    SingleFinite,
}

impl LevelIteration {
    /// True when finishing `current` out of `count` levels ends generation
    pub fn is_depleted(self, current: usize, count: usize) -> bool {
        match self {
            LevelIteration::OrderedFinite => current + 1 >= count,
            LevelIteration::SingleFinite => true,
            _ => false,
        }
    }

    fn step(self, current: usize, count: usize, randomizer: &mut Randomizer) -> usize {
        let max = count.saturating_sub(1);
        match self {
            LevelIteration::OrderedFinite | LevelIteration::OrderedClamp => (current + 1).min(max),
            LevelIteration::OrderedLoop => {
                if current + 1 > max {
                    0
                } else {
                    current + 1
                }
            }
            LevelIteration::Random => {
                let mut index = randomizer.range_i32(0, count as i32).max(0) as usize;
                if index == current {
                    index += 1;
                }
                if index >= max {
                    index = 0;
                }
                index
            }
            LevelIteration::SingleRepeat | LevelIteration::SingleFinite => current,
        }
    }

    /// Index of the level after `current`, retrying past disabled levels at most
    /// once per level
    pub fn next_index(self, current: usize, levels: &[Level], randomizer: &mut Randomizer) -> usize {
        if levels.is_empty() {
            return 0;
        }
        let count = levels.len();
        let mut next = self.step(current, count, randomizer);
        let mut attempts = count;
        while attempts > 0 && !levels[next].enabled {
            next = self.step(next, count, randomizer);
            attempts -= 1;
        }
        next
    }
}

/// First enabled level at or after `start`, clamped into the collection
pub fn resolve_start_level(start: usize, levels: &[Level]) -> Option<usize> {
    if levels.is_empty() {
        return None;
    }
    let start = start.min(levels.len() - 1);
    (start..levels.len()).find(|&i| levels[i].enabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(enabled: &[bool]) -> Vec<Level> {
        enabled
            .iter()
            .enumerate()
            .map(|(i, &on)| {
                let mut level = Level::new(format!("level{}", i), Vec::new());
                level.enabled = on;
                level
            })
            .collect()
    }

    #[test]
    fn test_ordered_clamps_and_loops() {
        let all = levels(&[true, true, true]);
        let mut rng = Randomizer::seeded(1);
        assert_eq!(LevelIteration::OrderedClamp.next_index(2, &all, &mut rng), 2);
        assert_eq!(LevelIteration::OrderedFinite.next_index(0, &all, &mut rng), 1);
        assert_eq!(LevelIteration::OrderedLoop.next_index(2, &all, &mut rng), 0);
        assert_eq!(LevelIteration::SingleRepeat.next_index(1, &all, &mut rng), 1);
    }

    #[test]
    fn test_disabled_levels_are_skipped() {
        let some = levels(&[true, false, true]);
        let mut rng = Randomizer::seeded(1);
        assert_eq!(LevelIteration::OrderedLoop.next_index(0, &some, &mut rng), 2);
    }

    #[test]
    fn test_retries_are_bounded() {
        let none = levels(&[false, false]);
        let mut rng = Randomizer::seeded(1);
        // gives up after one pass and returns wherever the walk stopped
        assert_eq!(LevelIteration::OrderedLoop.next_index(0, &none, &mut rng), 1);
    }

    #[test]
    fn test_random_stays_in_range() {
        let all = levels(&[true, true, true, true]);
        let mut rng = Randomizer::seeded(9);
        for current in 0..4 {
            let next = LevelIteration::Random.next_index(current, &all, &mut rng);
            assert!(next < 4);
        }
    }

    #[test]
    fn test_depletion() {
        assert!(LevelIteration::OrderedFinite.is_depleted(1, 2));
        assert!(!LevelIteration::OrderedFinite.is_depleted(0, 2));
        assert!(LevelIteration::SingleFinite.is_depleted(0, 5));
        assert!(!LevelIteration::OrderedLoop.is_depleted(4, 5));
    }

    #[test]
    fn test_start_level_resolution() {
        let some = levels(&[false, true, true]);
        assert_eq!(resolve_start_level(0, &some), Some(1));
        assert_eq!(resolve_start_level(9, &some), Some(2));
        assert_eq!(resolve_start_level(0, &levels(&[false])), None);
        assert_eq!(resolve_start_level(0, &[]), None);
    }
}
