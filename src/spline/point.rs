//! Spline control point

use serde::{Deserialize, Serialize};

use crate::core::types::{Color, Vec3, WHITE};
use crate::math::Transform;

/// A single control point with two Bezier handles
///
/// `tangent` is the incoming handle and `tangent2` the outgoing one. Both are
/// stored as absolute positions, not offsets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub position: Vec3,
    pub tangent: Vec3,
    pub tangent2: Vec3,
    pub normal: Vec3,
    pub size: f32,
    pub color: Color,
}

impl Default for ControlPoint {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            tangent: Vec3::ZERO,
            tangent2: Vec3::ZERO,
            normal: Vec3::Y,
            size: 1.0,
            color: WHITE,
        }
    }
}

impl ControlPoint {
    /// Point with both handles collapsed onto the position
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            tangent: position,
            tangent2: position,
            ..Default::default()
        }
    }

    /// Start-of-track point facing +Z: handle ahead, normal up
    pub fn origin() -> Self {
        Self {
            tangent: Vec3::Z,
            ..Default::default()
        }
    }

    /// Set the outgoing handle and mirror the incoming one through the position
    pub fn set_tangent2_mirrored(&mut self, tangent2: Vec3) {
        self.tangent2 = tangent2;
        self.tangent = self.position - (tangent2 - self.position);
    }

    /// Set the incoming handle and mirror the outgoing one through the position
    pub fn set_tangent_mirrored(&mut self, tangent: Vec3) {
        self.tangent = tangent;
        self.tangent2 = self.position - (tangent - self.position);
    }

    /// Move the point, dragging both handles along
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
        self.tangent += offset;
        self.tangent2 += offset;
    }

    /// Positions and handles as points, the normal as a direction
    pub fn transformed(&self, transform: &Transform) -> ControlPoint {
        ControlPoint {
            position: transform.transform_point(self.position),
            tangent: transform.transform_point(self.tangent),
            tangent2: transform.transform_point(self.tangent2),
            normal: transform.transform_direction(self.normal).normalize_or_zero(),
            size: self.size,
            color: self.color,
        }
    }

    pub fn inverse_transformed(&self, transform: &Transform) -> ControlPoint {
        ControlPoint {
            position: transform.inverse_transform_point(self.position),
            tangent: transform.inverse_transform_point(self.tangent),
            tangent2: transform.inverse_transform_point(self.tangent2),
            normal: transform.inverse_transform_direction(self.normal).normalize_or_zero(),
            size: self.size,
            color: self.color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Quat;

    #[test]
    fn test_mirrored_tangents() {
        let mut p = ControlPoint::new(Vec3::new(0.0, 0.0, 5.0));
        p.set_tangent2_mirrored(Vec3::new(0.0, 0.0, 6.0));
        assert_eq!(p.tangent, Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn test_transform_round_trip() {
        let t = Transform::from_position_rotation(Vec3::new(3.0, 1.0, 0.0), Quat::from_rotation_y(1.0));
        let mut p = ControlPoint::new(Vec3::new(1.0, 2.0, 3.0));
        p.set_tangent2_mirrored(Vec3::new(1.0, 2.0, 4.0));
        let back = p.transformed(&t).inverse_transformed(&t);
        assert!((back.position - p.position).length() < 1e-4);
        assert!((back.tangent - p.tangent).length() < 1e-4);
        assert!((back.normal - p.normal).length() < 1e-4);
    }
}
