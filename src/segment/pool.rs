//! Free lists of segment bodies, shared by the definitions that use them

use std::sync::Mutex;

use super::instance::Segment;

/// Capacity-bounded pool of destroyed segments waiting to be reused
#[derive(Debug)]
pub struct SegmentPool {
    capacity: usize,
    free: Mutex<Vec<Segment>>,
}

impl SegmentPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of segments currently waiting for reuse
    pub fn available(&self) -> usize {
        self.free.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// Pop a pooled segment whose template matches `template_name`
    pub fn take(&self, template_name: &str) -> Option<Segment> {
        let mut free = self.free.lock().ok()?;
        let index = free.iter().position(|s| s.template.name == template_name)?;
        Some(free.swap_remove(index))
    }

    /// Return a segment to the pool. Returns `false` and drops it when full.
    ///
    /// The segment's own pool handle is dropped so parked bodies never keep
    /// their pool alive.
    pub fn give(&self, mut segment: Segment) -> bool {
        segment.pool = None;
        let Ok(mut free) = self.free.lock() else {
            return false;
        };
        if free.len() >= self.capacity {
            return false;
        }
        free.push(segment);
        true
    }

    pub fn clear(&self) {
        if let Ok(mut free) = self.free.lock() {
            free.clear();
        }
    }
}
