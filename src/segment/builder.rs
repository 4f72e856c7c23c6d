//! Segment builders: deferred per-segment construction steps

use std::fmt;
use std::sync::Arc;

use crate::core::Randomizer;
use super::object::SegmentObject;

/// When a builder runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildQueue {
    /// Right after the segment is extruded
    #[default]
    OnGenerate,
    /// When the segment is activated ahead of the viewer
    OnActivate,
}

/// What a builder may touch while running
pub struct BuildContext<'a> {
    pub segment_index: u64,
    pub objects: &'a mut [SegmentObject],
    /// Generation randomizer owned by the track generator
    pub randomizer: &'a mut Randomizer,
}

/// Construction step attached to a segment template
///
/// Builders run in ascending [`priority`](Builder::priority). Activation of a
/// segment waits until every builder reports [`is_done`](Builder::is_done).
pub trait Builder: Send {
    fn queue(&self) -> BuildQueue {
        BuildQueue::OnGenerate
    }

    fn priority(&self) -> i32 {
        0
    }

    /// Called each time the segment is placed, fresh or recycled from a pool
    fn setup(&mut self, _ctx: &mut BuildContext<'_>) {}

    fn start(&mut self, ctx: &mut BuildContext<'_>);

    /// Advance work that spans several ticks
    fn tick(&mut self, _ctx: &mut BuildContext<'_>) {}

    fn is_done(&self) -> bool {
        true
    }
}

/// Creates a fresh builder for every instantiated segment
#[derive(Clone)]
pub struct BuilderFactory(Arc<dyn Fn() -> Box<dyn Builder> + Send + Sync>);

impl BuilderFactory {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Box<dyn Builder> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn create(&self) -> Box<dyn Builder> {
        (self.0)()
    }
}

impl fmt::Debug for BuilderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BuilderFactory")
    }
}

/// Builder slot on a live segment
pub(crate) struct BuilderSlot {
    pub builder: Box<dyn Builder>,
    pub started: bool,
}

/// Enables a random share of an object's direct children
///
/// All children start inactive. On build, `round(count * p)` of them are
/// switched on, with `p` drawn between `min_percent` and `max_percent`.
#[derive(Clone, Debug)]
pub struct ActiveRandomChildren {
    pub object: usize,
    pub min_percent: f32,
    pub max_percent: f32,
    pub queue: BuildQueue,
    pub priority: i32,
}

impl ActiveRandomChildren {
    pub fn new(object: usize, min_percent: f32, max_percent: f32) -> Self {
        Self {
            object,
            min_percent: min_percent.clamp(0.0, 1.0),
            max_percent: max_percent.clamp(0.0, 1.0),
            queue: BuildQueue::OnGenerate,
            priority: 0,
        }
    }

    fn children(&self, objects: &[SegmentObject]) -> Vec<usize> {
        objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.parent == Some(self.object))
            .map(|(i, _)| i)
            .collect()
    }
}

impl Builder for ActiveRandomChildren {
    fn queue(&self) -> BuildQueue {
        self.queue
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn setup(&mut self, ctx: &mut BuildContext<'_>) {
        for i in self.children(ctx.objects) {
            ctx.objects[i].active = false;
        }
    }

    fn start(&mut self, ctx: &mut BuildContext<'_>) {
        let t = ctx.randomizer.range(0.0, 1.0);
        let percent = self.min_percent + (self.max_percent - self.min_percent) * t;
        let mut available = self.children(ctx.objects);
        if available.is_empty() {
            return;
        }
        let active_count = (available.len() as f32 * percent).round() as usize;
        for _ in 0..active_count {
            // first and last remaining child are half as likely as the others
            let pick = ctx.randomizer.range_i32(0, available.len() as i32).clamp(0, available.len() as i32 - 1);
            let index = available.remove(pick as usize);
            ctx.objects[index].active = true;
        }
        log::trace!(
            "Segment {}: activated {} children of object {}",
            ctx.segment_index,
            active_count,
            self.object
        );
    }
}
