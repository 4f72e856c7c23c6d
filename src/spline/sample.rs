//! Evaluated point on a path

use crate::core::types::{Color, Percent, Quat, Vec3, WHITE};
use crate::math::{Transform, look_rotation};

/// Position and orientation frame of a path at some percent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub size: f32,
    pub color: Color,
    pub percent: Percent,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
            size: 1.0,
            color: WHITE,
            percent: 0.0,
        }
    }
}

impl Sample {
    pub fn right(&self) -> Vec3 {
        self.up.cross(self.forward).normalize_or_zero()
    }

    /// Frame as a rotation (+Z forward, +Y up)
    pub fn rotation(&self) -> Quat {
        look_rotation(self.forward, self.up)
    }

    /// Interpolate two samples. Frame vectors are lerped then renormalized.
    pub fn lerp(a: &Sample, b: &Sample, t: f32) -> Sample {
        Sample {
            position: a.position.lerp(b.position, t),
            forward: lerp_direction(a.forward, b.forward, t),
            up: lerp_direction(a.up, b.up, t),
            size: a.size + (b.size - a.size) * t,
            color: a.color.lerp(b.color, t),
            percent: a.percent + (b.percent - a.percent) * t as f64,
        }
    }

    pub fn transformed(&self, transform: &Transform) -> Sample {
        Sample {
            position: transform.transform_point(self.position),
            forward: transform.transform_direction(self.forward),
            up: transform.transform_direction(self.up),
            ..*self
        }
    }
}

fn lerp_direction(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let v = a.lerp(b, t);
    if v.length_squared() < 1e-12 {
        // opposite vectors, keep the nearer end
        if t < 0.5 { a } else { b }
    } else {
        v.normalize()
    }
}
