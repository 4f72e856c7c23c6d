//! Strictly serial queue of generation work

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::segment::SegmentTemplate;

/// Unit of work the generator runs one at a time
#[derive(Clone)]
pub enum TrackAction {
    /// Create the next segment picked by the current level
    CreateNext,
    /// Create a segment from an explicit template
    CreateCustom(Arc<SegmentTemplate>),
    LoadLevel(usize),
    UnloadLevel(usize),
}

impl fmt::Debug for TrackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackAction::CreateNext => f.write_str("CreateNext"),
            TrackAction::CreateCustom(template) => write!(f, "CreateCustom({})", template.name),
            TrackAction::LoadLevel(level) => write!(f, "LoadLevel({})", level),
            TrackAction::UnloadLevel(level) => write!(f, "UnloadLevel({})", level),
        }
    }
}

/// FIFO of [`TrackAction`]s with at most one in flight
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending: VecDeque<TrackAction>,
    in_flight: bool,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: TrackAction) {
        log::trace!("Queued {:?}", action);
        self.pending.push_back(action);
    }

    /// Take the next action when nothing is in flight
    pub fn begin(&mut self) -> Option<TrackAction> {
        if self.in_flight {
            return None;
        }
        let action = self.pending.pop_front()?;
        self.in_flight = true;
        Some(action)
    }

    /// Mark the in-flight action complete
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    /// Drop everything queued behind the in-flight action
    pub fn interrupt(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("Interrupted {} queued actions", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight || !self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
