//! Levels: a sequence list, an optional path generator and an optional remote source

use crate::path::PathGenerator;
use super::definition::Selection;
use super::sequence::SegmentSequence;

/// Result of asking a level for its next segment
#[derive(Debug)]
pub struct LevelPick {
    pub selection: Selection,
    /// Set when this pick came from a different sequence than the previous one
    pub entered_sequence: Option<usize>,
}

/// Sequences and generator resolved for a remote level
#[derive(Debug, Default)]
pub struct LevelContent {
    pub sequences: Vec<SegmentSequence>,
    pub path_generator: Option<PathGenerator>,
}

#[derive(Debug)]
pub struct Level {
    pub name: String,
    pub enabled: bool,
    /// Takes over path generation while this level is current
    pub path_generator: Option<PathGenerator>,
    pub sequences: Vec<SegmentSequence>,
    /// Name handed to the level source; the level is not ready until loaded
    pub remote: Option<String>,
    remote_loaded: bool,
    last_sequence: Option<usize>,
}

impl Default for Level {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            path_generator: None,
            sequences: Vec::new(),
            remote: None,
            remote_loaded: false,
            last_sequence: None,
        }
    }
}

impl Level {
    pub fn new(name: impl Into<String>, sequences: Vec<SegmentSequence>) -> Self {
        Self {
            name: name.into(),
            sequences,
            ..Default::default()
        }
    }

    /// Level whose sequences are fetched from a level source by `source_name`
    pub fn remote(name: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: Some(source_name.into()),
            ..Default::default()
        }
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.remote_loaded
    }

    pub fn is_ready(&self) -> bool {
        self.remote.is_none() || self.remote_loaded
    }

    pub fn initialize(&mut self) {
        self.last_sequence = None;
        for sequence in &mut self.sequences {
            sequence.initialize();
        }
    }

    /// Every enabled sequence is done
    pub fn is_done(&self) -> bool {
        self.sequences.iter().all(|s| !s.enabled || s.is_done())
    }

    /// First enabled sequence that is not done
    pub fn current_sequence(&self) -> Option<usize> {
        self.sequences.iter().position(|s| s.enabled && !s.is_done())
    }

    pub fn sequence(&self, index: usize) -> Option<&SegmentSequence> {
        self.sequences.get(index)
    }

    pub fn next_definition(&mut self) -> Option<LevelPick> {
        let Some(current) = self.current_sequence() else {
            log::error!("Level {} has no sequence left to pick from", self.name);
            return None;
        };
        let entered_sequence = if self.last_sequence != Some(current) {
            log::debug!("Level {} entered sequence {}", self.name, self.sequences[current].name);
            self.last_sequence = Some(current);
            Some(current)
        } else {
            None
        };
        let selection = self.sequences[current].next()?;
        Some(LevelPick { selection, entered_sequence })
    }

    /// Stop the current sequence so the next one takes over
    pub fn skip_sequence(&mut self) {
        if let Some(current) = self.current_sequence() {
            self.sequences[current].stop();
        }
    }

    /// Stop every unfinished sequence before `index` and rewind the rest
    pub fn go_to_sequence(&mut self, index: usize) {
        for sequence in self.sequences.iter_mut().take(index) {
            if !sequence.is_done() {
                sequence.stop();
            }
        }
        for sequence in self.sequences.iter_mut().skip(index) {
            sequence.initialize();
        }
    }

    /// Install content fetched for a remote level
    pub fn set_loaded(&mut self, content: LevelContent) {
        self.sequences = content.sequences;
        if content.path_generator.is_some() {
            self.path_generator = content.path_generator;
        }
        self.remote_loaded = true;
    }

    /// Drop remote content; local levels are left untouched
    pub fn unload(&mut self) {
        if !self.remote_loaded {
            return;
        }
        self.sequences.clear();
        self.last_sequence = None;
        self.remote_loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::segment::SegmentTemplate;
    use crate::sequence::{SegmentDefinition, SelectionPolicy};

    fn ordered(name: &str, templates: &[&str]) -> SegmentSequence {
        SegmentSequence::new(name, SelectionPolicy::Ordered).with_definitions(
            templates
                .iter()
                .map(|t| SegmentDefinition::new(Arc::new(SegmentTemplate::new(*t))))
                .collect(),
        )
    }

    #[test]
    fn test_sequences_run_in_order() {
        let mut level = Level::new("one", vec![ordered("intro", &["a"]), ordered("main", &["b", "c"])]);
        level.initialize();

        let first = level.next_definition().unwrap();
        assert_eq!(first.selection.name(), Some("a"));
        assert_eq!(first.entered_sequence, Some(0));

        let second = level.next_definition().unwrap();
        assert_eq!(second.entered_sequence, Some(1));
        let third = level.next_definition().unwrap();
        assert_eq!(third.selection.name(), Some("c"));
        assert_eq!(third.entered_sequence, None);
        assert!(level.is_done());
        assert!(level.next_definition().is_none());
    }

    #[test]
    fn test_disabled_sequence_is_skipped() {
        let mut disabled = ordered("off", &["x"]);
        disabled.enabled = false;
        let mut level = Level::new("one", vec![disabled, ordered("on", &["y"])]);
        level.initialize();
        assert_eq!(level.current_sequence(), Some(1));
    }

    #[test]
    fn test_skip_and_go_to_sequence() {
        let mut level = Level::new("one", vec![ordered("a", &["a1", "a2"]), ordered("b", &["b1"])]);
        level.initialize();
        level.skip_sequence();
        assert_eq!(level.current_sequence(), Some(1));

        level.go_to_sequence(0);
        assert_eq!(level.current_sequence(), Some(0));
        level.go_to_sequence(1);
        assert_eq!(level.current_sequence(), Some(1));
    }

    #[test]
    fn test_remote_level_readiness() {
        let mut level = Level::remote("far", "far_level");
        assert!(!level.is_ready());
        level.set_loaded(LevelContent { sequences: vec![ordered("s", &["a"])], path_generator: None });
        assert!(level.is_ready());
        level.unload();
        assert!(!level.is_ready());
        assert!(level.sequences.is_empty());
    }
}
