//! Helix around a fixed axis

use serde::{Deserialize, Serialize};

use crate::core::types::{Vec3, WHITE};
use crate::math::angle_axis;
use crate::spline::ControlPoint;
use super::generator::SegmentFrame;

/// Spiral axis. Negative variants turn the other way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiralAxis {
    X,
    #[default]
    Y,
    Z,
    NegativeX,
    NegativeY,
    NegativeZ,
}

impl SpiralAxis {
    /// `(right, up, forward)` basis the spiral is built in
    fn basis(self) -> (Vec3, Vec3, Vec3) {
        match self {
            SpiralAxis::X => (Vec3::Y, -Vec3::X, Vec3::Z),
            SpiralAxis::Y => (Vec3::X, Vec3::Y, Vec3::Z),
            SpiralAxis::Z => (Vec3::X, -Vec3::Z, Vec3::Y),
            SpiralAxis::NegativeX => (-Vec3::Y, Vec3::X, Vec3::Z),
            SpiralAxis::NegativeY => (-Vec3::X, -Vec3::Y, Vec3::Z),
            SpiralAxis::NegativeZ => (-Vec3::X, Vec3::Z, Vec3::Y),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiralPath {
    pub axis: SpiralAxis,
    /// Degrees turned per control point
    pub spin_rate: f32,
    /// Climb angle in degrees
    pub steepness: f32,
    /// Bank of the normal around the flattened tangent, degrees
    pub normal_rotation: f32,
    #[serde(skip)]
    spin: f32,
}

impl Default for SpiralPath {
    fn default() -> Self {
        Self {
            axis: SpiralAxis::Y,
            spin_rate: 10.0,
            steepness: 10.0,
            normal_rotation: 0.0,
            spin: 0.0,
        }
    }
}

impl SpiralPath {
    pub fn initialize(&mut self) {
        self.spin = 0.0;
    }

    pub fn spin(&self) -> f32 {
        self.spin
    }

    pub fn generate_point(&mut self, frame: &SegmentFrame, first: bool, last_point: &ControlPoint) -> ControlPoint {
        let (right, up, forward) = self.axis.basis();
        let distance = frame.point_distance;
        let steepness = angle_axis(self.steepness, right);

        let mut position = last_point.position;
        if !first {
            position += angle_axis(self.spin, up) * steepness * forward * distance;
        }
        let mut direction = angle_axis(self.spin + self.spin_rate * 0.5, up) * steepness * forward;

        let handle_length = if self.spin_rate.abs() > f32::EPSILON {
            let radius = distance / (self.spin_rate * 0.9).to_radians();
            let points_per_turn = 360.0 / self.spin_rate;
            radius * points_per_turn * (self.spin_rate.to_radians() / points_per_turn).tan() / 3.0
        } else {
            distance / 3.0
        };
        let handle = direction * handle_length;

        direction.y = 0.0;
        let point = ControlPoint {
            position,
            tangent: position - handle,
            tangent2: position + handle,
            normal: angle_axis(self.normal_rotation, direction) * up,
            size: 1.0,
            color: WHITE,
        };

        self.spin += self.spin_rate;
        if self.spin > 360.0 {
            self.spin -= 360.0;
        }
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_wraps() {
        let mut spiral = SpiralPath { spin_rate: 100.0, ..Default::default() };
        let frame = SegmentFrame::detached(5, 1.0);
        let mut last = ControlPoint::origin();
        for _ in 0..4 {
            last = spiral.generate_point(&frame, false, &last);
        }
        assert!((spiral.spin() - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_flat_spiral_stays_at_step_distance() {
        let mut spiral = SpiralPath { steepness: 0.0, spin_rate: 30.0, ..Default::default() };
        let frame = SegmentFrame::detached(5, 2.0);
        let first = spiral.generate_point(&frame, true, &ControlPoint::origin());
        assert_eq!(first.position, Vec3::ZERO);
        let second = spiral.generate_point(&frame, false, &first);
        assert!((second.position.distance(first.position) - 2.0).abs() < 1e-4);
        assert!(second.position.y.abs() < 1e-5);
        assert!((second.normal - Vec3::Y).length() < 1e-4);
    }
}
