//! Mathematical utilities and data structures

pub mod aabb;
pub mod angle;
pub mod ramp;
pub mod transform;

pub use aabb::Aabb;
pub use ramp::{Lerp, Ramp};
pub use transform::{Transform, angle_axis, euler, from_to_rotation, look_rotation, to_euler};
