//! Ordered, weighted random, shuffled and custom selection over definitions

use std::fmt;

use crate::core::Randomizer;
use crate::path::PathGenerator;
use super::definition::{SegmentDefinition, Selection};

/// User-supplied selection logic
pub trait SegmentSelector: Send {
    /// Called whenever the owning sequence is initialized
    fn reset(&mut self);

    /// Index into `definitions` for the `index`-th pick, or `None` to pick nothing
    fn next(&mut self, definitions: &[SegmentDefinition], index: usize) -> Option<usize>;

    fn is_done(&self) -> bool;
}

#[derive(Default)]
pub enum SelectionPolicy {
    /// Definitions in order, clamped to the last one
    #[default]
    Ordered,
    /// Weighted by `random_pick_chance`
    Random { prevent_repeat: bool },
    /// Permutations of all definitions, one after another
    Shuffled,
    Custom(Box<dyn SegmentSelector>),
}

impl fmt::Debug for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::Ordered => write!(f, "Ordered"),
            SelectionPolicy::Random { prevent_repeat } => {
                f.debug_struct("Random").field("prevent_repeat", prevent_repeat).finish()
            }
            SelectionPolicy::Shuffled => write!(f, "Shuffled"),
            SelectionPolicy::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// A list of definitions and the policy that picks from it
///
/// Definitions may wrap nested sequences. A nested pick keeps delegating to
/// the child until the child is done, and the parent never reports done
/// while that child is still active.
#[derive(Debug)]
pub struct SegmentSequence {
    pub name: String,
    pub enabled: bool,
    pub definitions: Vec<SegmentDefinition>,
    pub policy: SelectionPolicy,
    /// Picks before a random or shuffled sequence is done. 0 means endless
    /// for random and one full permutation for shuffled.
    pub spawn_count: usize,
    /// Replaces the level's path generator while this sequence is current
    pub path_generator: Option<PathGenerator>,
    /// Required by the random and shuffled policies
    pub randomizer: Option<Randomizer>,
    index: usize,
    stopped: bool,
    last: Option<usize>,
    last_random: Option<usize>,
    shuffled: Vec<usize>,
}

impl Default for SegmentSequence {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            definitions: Vec::new(),
            policy: SelectionPolicy::Ordered,
            spawn_count: 1,
            path_generator: None,
            randomizer: None,
            index: 0,
            stopped: false,
            last: None,
            last_random: None,
            shuffled: Vec::new(),
        }
    }
}

impl SegmentSequence {
    pub fn new(name: impl Into<String>, policy: SelectionPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            ..Default::default()
        }
    }

    pub fn with_definitions(mut self, definitions: Vec<SegmentDefinition>) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn with_randomizer(mut self, randomizer: Randomizer) -> Self {
        self.randomizer = Some(randomizer);
        self
    }

    pub fn with_spawn_count(mut self, spawn_count: usize) -> Self {
        self.spawn_count = spawn_count;
        self
    }

    /// Number of picks made since the last initialize
    pub fn picks(&self) -> usize {
        self.index
    }

    /// Rewind selection state, re-seed and rewind every nested sequence
    pub fn initialize(&mut self) {
        if let Some(randomizer) = &mut self.randomizer {
            randomizer.initialize();
        }
        self.index = 0;
        self.stopped = false;
        self.last = None;
        self.last_random = None;
        self.shuffled.clear();
        for definition in &mut self.definitions {
            if let Some(nested) = &mut definition.nested {
                nested.initialize();
            }
        }
        if let SelectionPolicy::Custom(selector) = &mut self.policy {
            selector.reset();
        }
    }

    /// Mark this sequence and all of its children as done
    pub fn stop(&mut self) {
        self.stopped = true;
        for definition in &mut self.definitions {
            if let Some(nested) = &mut definition.nested {
                nested.stop();
            }
        }
    }

    fn active_nested(&self) -> Option<&SegmentSequence> {
        self.last
            .and_then(|i| self.definitions.get(i))
            .and_then(|d| d.nested.as_deref())
            .filter(|nested| !nested.is_done())
    }

    pub fn is_done(&self) -> bool {
        if self.stopped || self.definitions.is_empty() {
            return true;
        }
        if self.active_nested().is_some() {
            return false;
        }
        match &self.policy {
            SelectionPolicy::Ordered => self.index >= self.definitions.len(),
            SelectionPolicy::Random { .. } => self.spawn_count != 0 && self.index >= self.spawn_count,
            SelectionPolicy::Shuffled => {
                if self.spawn_count == 0 {
                    self.index >= self.definitions.len()
                } else {
                    self.index >= self.spawn_count
                }
            }
            SelectionPolicy::Custom(selector) => selector.is_done(),
        }
    }

    /// Pick the next definition, descending into nested sequences
    pub fn next(&mut self) -> Option<Selection> {
        if self.active_nested().is_some() {
            let last = self.last?;
            return self.definitions[last].nested.as_mut()?.next();
        }
        if self.definitions.is_empty() {
            return None;
        }

        let picked = self.pick()?;
        self.last = Some(picked);
        self.index += 1;

        let definition = &mut self.definitions[picked];
        match &mut definition.nested {
            Some(nested) => {
                nested.initialize();
                nested.next()
            }
            None => Some(definition.selection()),
        }
    }

    fn pick(&mut self) -> Option<usize> {
        let len = self.definitions.len();
        match &mut self.policy {
            SelectionPolicy::Ordered => Some(self.index.min(len - 1)),
            SelectionPolicy::Random { prevent_repeat } => {
                let exclude = if *prevent_repeat { self.last_random } else { None };
                let Some(randomizer) = self.randomizer.as_mut() else {
                    log::error!("Sequence {} selects randomly but has no randomizer", self.name);
                    return None;
                };
                let picked = pick_by_chance(&self.definitions, exclude, randomizer);
                self.last_random = Some(picked);
                Some(picked)
            }
            SelectionPolicy::Shuffled => {
                if self.shuffled.is_empty() {
                    let Some(randomizer) = self.randomizer.as_mut() else {
                        log::error!("Sequence {} shuffles but has no randomizer", self.name);
                        return None;
                    };
                    self.shuffled = (0..len).collect();
                    shuffle(&mut self.shuffled, randomizer);
                    if self.shuffled.first().copied() == self.last_random {
                        self.shuffled.swap(0, len - 1);
                    }
                    self.last_random = self.shuffled.last().copied();
                }
                Some(self.shuffled.remove(0))
            }
            SelectionPolicy::Custom(selector) => {
                let picked = selector.next(&self.definitions, self.index)?;
                if picked >= len {
                    log::error!("Sequence {} selector picked {} of {} definitions", self.name, picked, len);
                    return None;
                }
                Some(picked)
            }
        }
    }
}

/// Walk the cumulative weights, skipping `exclude` and non-positive weights
fn pick_by_chance(definitions: &[SegmentDefinition], exclude: Option<usize>, randomizer: &mut Randomizer) -> usize {
    let total: f32 = definitions
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != exclude)
        .map(|(_, d)| d.random_pick_chance)
        .sum();
    let value = randomizer.range(0.0, total);
    let mut passed = 0.0;
    for (i, definition) in definitions.iter().enumerate() {
        if Some(i) == exclude || definition.random_pick_chance <= 0.0 {
            continue;
        }
        let chance = definition.random_pick_chance;
        if value >= passed && value <= passed + chance {
            return i;
        }
        passed += chance;
    }
    0
}

/// Fisher-Yates
fn shuffle(list: &mut [usize], randomizer: &mut Randomizer) {
    let mut n = list.len();
    while n > 1 {
        n -= 1;
        let k = randomizer.range_i32(0, n as i32 + 1) as usize;
        list.swap(k, n);
    }
}
