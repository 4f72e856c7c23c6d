//! Slicing of per-item work across ticks

use std::ops::Range;

/// Ticks a batch is spread over
pub const BATCH_FRAMES: usize = 10;

/// Hands out consecutive chunks of `0..len`, one chunk per tick
///
/// The chunk size is `len / frames`, at least 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchCursor {
    len: usize,
    chunk: usize,
    next: usize,
}

impl BatchCursor {
    pub fn new(len: usize) -> Self {
        Self::with_frames(len, BATCH_FRAMES)
    }

    pub fn with_frames(len: usize, frames: usize) -> Self {
        Self {
            len,
            chunk: (len / frames.max(1)).max(1),
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.len
    }

    /// Next range to process, or `None` once everything was handed out
    pub fn next_range(&mut self) -> Option<Range<usize>> {
        if self.is_done() {
            return None;
        }
        let start = self.next;
        self.next = (start + self.chunk).min(self.len);
        Some(start..self.next)
    }

    /// Fraction handed out so far
    pub fn progress(&self) -> f32 {
        if self.len == 0 {
            1.0
        } else {
            self.next as f32 / self.len as f32
        }
    }
}
