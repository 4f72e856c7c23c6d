//! Trackforge - procedural track generation
//!
//! Builds an endless track out of authored segment templates. Levels pick
//! the next template, a path generator lays out its spline, and the
//! extrusion pipeline bends the template's geometry onto it.

pub mod core;
pub mod math;
pub mod spline;
pub mod segment;
pub mod path;
pub mod sequence;
pub mod extrusion;
pub mod streaming;
pub mod generator;

pub use crate::core::{Error, Result};
pub use generator::{GeneratorConfig, TrackEvent, TrackGenerator};
