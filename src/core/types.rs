//! Core type aliases and re-exports

pub use glam::{
    Vec2, Vec3, Vec4,
    Mat3, Mat4,
    Quat, EulerRot,
};

/// RGBA color, components in 0..1
pub type Color = Vec4;

/// Opaque white
pub const WHITE: Color = Vec4::ONE;

/// Normalized position along a path or the whole track, always in 0..=1
pub type Percent = f64;

/// Standard Result type for the generator
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
