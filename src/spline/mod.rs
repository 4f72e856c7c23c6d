//! Spline primitives: control points, curves and cached paths

pub mod point;
pub mod sample;
pub mod curve;
pub mod path;

pub use point::ControlPoint;
pub use sample::Sample;
pub use curve::{Spline, SplineKind};
pub use path::{EvaluateMode, SplinePath, TravelDirection};
