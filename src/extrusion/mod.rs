//! Bending segment geometry along generated paths

pub mod batch;
pub mod mapping;
pub mod pipeline;

pub use batch::{BATCH_FRAMES, BatchCursor};
pub use mapping::{ExtrusionJob, ExtrusionOutput, Mapped, ObjectInput, PathMapper, extrude_lane, extrude_object};
pub use pipeline::{ExtrusionPipeline, ExtrusionState, ExtrusionStep};
