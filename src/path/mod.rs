//! Path generation: synthesizes spline control points segment by segment
//!
//! [`PathGenerator`] carries the last emitted point across segments and
//! dispatches point placement to a [`PathStrategy`]. Templates can hook in
//! through [`PathRule`]s.

pub mod custom;
pub mod generator;
pub mod heading;
pub mod random;
pub mod rule;
pub mod spiral;
pub mod strategy;
pub mod wavy;

pub use custom::CustomPath;
pub use generator::{PathGenerator, SegmentFrame, SegmentLink, TrackContext, auto_tangents, extrapolate_point};
pub use heading::{Heading, HeadingPoint};
pub use random::{AxisFlags, OffsetRange, OffsetSpace, RandomPath};
pub use rule::{PathRule, RandomTarget};
pub use spiral::{SpiralAxis, SpiralPath};
pub use strategy::PathStrategy;
pub use wavy::WavyPath;
