//! Orientation swinging back and forth around an axis

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::math::angle::move_towards;
use crate::spline::ControlPoint;
use super::generator::SegmentFrame;
use super::heading::Heading;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WavyPath {
    pub heading: Heading,
    /// Swing amplitude in degrees
    pub angle: f32,
    /// Degrees moved per control point
    pub turn_rate: f32,
    pub turn_axis: Vec3,
    #[serde(skip)]
    current: f32,
    #[serde(skip)]
    positive: bool,
}

impl Default for WavyPath {
    fn default() -> Self {
        Self {
            heading: Heading::default(),
            angle: 45.0,
            turn_rate: 0.0,
            turn_axis: Vec3::Y,
            current: 0.0,
            positive: true,
        }
    }
}

impl WavyPath {
    /// Swing of `angle` degrees either way, moving `turn_rate` degrees per point
    pub fn new(angle: f32, turn_rate: f32) -> Self {
        Self {
            angle,
            turn_rate,
            ..Default::default()
        }
    }

    pub fn initialize(&mut self) {
        self.heading.initialize();
        self.current = 0.0;
        self.positive = true;
    }

    pub fn current_angle(&self) -> f32 {
        self.current
    }

    pub fn generate_point(&mut self, frame: &SegmentFrame, index: usize, first: bool) -> ControlPoint {
        let mut point = self.heading.base_point();
        if !first {
            if self.positive && self.current == self.angle {
                self.positive = false;
            } else if self.current == -self.angle {
                self.positive = true;
            }
            let target = if self.positive { self.angle } else { -self.angle };
            self.current = move_towards(self.current, target, self.turn_rate);
            let axis = self.turn_axis.normalize_or_zero();
            self.heading.set_orientation(self.heading.orientation() + axis * self.current);
            point.position = self.heading.point_position(frame.point_distance);
            point.auto_rotation = true;
        }
        self.heading.record(index, point)
    }
}
