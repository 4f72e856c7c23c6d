//! Orientation-driven point placement shared by the random and wavy strategies
//!
//! Heading strategies first lay out a light list of [`HeadingPoint`]s by
//! stepping along an Euler orientation, then write them into spline control
//! points in [`Heading::write_points`].

use serde::{Deserialize, Serialize};

use crate::core::types::{Color, Quat, Vec3, WHITE};
use crate::math::{Transform, angle_axis, euler, look_rotation, to_euler};
use crate::segment::Segment;
use crate::spline::{ControlPoint, EvaluateMode};
use super::generator::{SegmentFrame, extrapolate_point};

/// Intermediate point of a heading strategy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadingPoint {
    pub position: Vec3,
    pub size: f32,
    pub color: Color,
    /// Derive handles from the neighbours instead of `rotation`
    pub auto_rotation: bool,
    /// Euler angles in degrees
    pub rotation: Vec3,
}

impl Default for HeadingPoint {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            size: 1.0,
            color: WHITE,
            auto_rotation: true,
            rotation: Vec3::ZERO,
        }
    }
}

/// Orientation state carried from segment to segment
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Heading {
    /// Orientation applied on every `initialize`, Euler degrees
    pub start_orientation: Vec3,
    /// Force every written normal to this direction
    pub custom_normal: Option<Vec3>,
    #[serde(skip)]
    orientation: Vec3,
    #[serde(skip)]
    roll: f32,
    #[serde(skip)]
    last: HeadingPoint,
    #[serde(skip)]
    points: Vec<HeadingPoint>,
}

impl Heading {
    pub fn initialize(&mut self) {
        self.set_orientation(self.start_orientation);
        self.roll = 0.0;
        self.last = HeadingPoint::default();
        self.points.clear();
    }

    pub fn orientation(&self) -> Vec3 {
        self.orientation
    }

    pub fn last(&self) -> &HeadingPoint {
        &self.last
    }

    /// Set the orientation, folding components above 180 down by whole turns
    ///
    /// The fold subtracts `floor(v / 180)` turns, so 270 becomes -90 while 540
    /// lands on -540.
    pub fn set_orientation(&mut self, input: Vec3) {
        let fold = |v: f32| if v > 180.0 { v - (v / 180.0).floor() * 360.0 } else { v };
        self.orientation = Vec3::new(fold(input.x), fold(input.y), fold(input.z));
    }

    /// Set the orientation as is, without folding
    pub fn turn_to(&mut self, orientation: Vec3) {
        self.orientation = orientation;
    }

    /// Take over the full state of another heading strategy
    pub fn continue_from_heading(&mut self, previous: &Heading) {
        self.orientation = previous.orientation;
        self.roll = previous.roll;
        self.last = previous.last;
    }

    /// Derive the orientation from a plain control point
    pub fn continue_from_point(&mut self, last_point: &ControlPoint) {
        let rotation = look_rotation(last_point.tangent2 - last_point.position, last_point.normal);
        self.orientation = to_euler(rotation);
    }

    /// Re-anchor on the end of a live segment
    pub fn continue_from_segment(&mut self, segment: &Segment, owner: &Transform) {
        let sample = segment.evaluate(1.0, EvaluateMode::Cached);
        let end = segment
            .path
            .spline()
            .points
            .last()
            .map(|p| p.position)
            .unwrap_or(sample.position);
        let rotation = owner.rotation.inverse() * sample.rotation();
        self.last.position = owner.inverse_transform_point(end);
        self.last.rotation = to_euler(rotation);
        self.last.size = sample.size;
        self.last.color = sample.color;
        self.set_orientation(self.last.rotation);
    }

    /// Position one point distance ahead of the last point along the orientation
    pub fn point_position(&self, distance: f32) -> Vec3 {
        let direction = euler(self.orientation) * Vec3::Z;
        self.last.position + direction * distance
    }

    /// Current up vector including roll
    pub fn point_normal(&self) -> Vec3 {
        let direction = euler(self.orientation) * Vec3::Z;
        angle_axis(self.roll, direction) * Vec3::Y
    }

    pub fn before_generation(&mut self, frame: &SegmentFrame, points: &[ControlPoint], last_point: &ControlPoint) {
        self.last.position = last_point.position;
        self.points = points
            .iter()
            .map(|p| HeadingPoint { position: p.position, ..Default::default() })
            .collect();
        if let Some(exit) = &frame.previous_exit {
            self.set_orientation(to_euler(exit.rotation));
        }
    }

    /// Copy of the last point, the starting value of every generated point
    pub fn base_point(&self) -> HeadingPoint {
        self.last
    }

    /// Store a generated point and advance the carried state
    pub fn record(&mut self, index: usize, point: HeadingPoint) -> ControlPoint {
        if let Some(slot) = self.points.get_mut(index) {
            *slot = point;
        }
        self.last.position = point.position;
        self.last.rotation = point.rotation;
        ControlPoint {
            position: point.position,
            tangent: point.position,
            tangent2: point.position,
            normal: self.point_normal(),
            size: point.size,
            color: point.color,
        }
    }

    /// Write the heading points into spline control points
    ///
    /// The welded first point of a stitched segment is left untouched.
    pub fn write_points(&self, frame: &SegmentFrame, targets: &mut [ControlPoint]) {
        let start = if frame.has_previous && frame.stitch { 1 } else { 0 };
        for index in start..targets.len().min(self.points.len()) {
            self.write_point(index, &mut targets[index]);
        }
    }

    fn write_point(&self, index: usize, target: &mut ControlPoint) {
        let points = &self.points;
        let n = points.len();
        let position = points[index].position;
        let prev = if index > 0 {
            points[index - 1].position
        } else if n > 2 {
            extrapolate_point(points[2].position, points[1].position, points[0].position)
        } else {
            position + (position - points[1].position)
        };
        let next = if index + 1 < n {
            points[index + 1].position
        } else if n > 2 {
            extrapolate_point(points[index - 2].position, points[index - 1].position, position)
        } else {
            position + (position - points[index - 1].position)
        };
        let delta = (next - prev) / 2.0;

        target.position = position;
        if points[index].auto_rotation {
            target.normal = Vec3::Y;
            target.tangent = position - delta / 3.0;
            target.tangent2 = position + delta / 3.0;
        } else {
            let rotation: Quat = euler(points[index].rotation);
            target.normal = rotation * Vec3::Y;
            target.tangent = position - rotation * Vec3::Z * delta.length() / 3.0;
            target.tangent2 = position + (position - target.tangent);
        }
        if let Some(normal) = self.custom_normal {
            target.normal = normal;
        }
        target.size = points[index].size;
        target.color = points[index].color;
    }

    pub fn shift_origin(&mut self, local_offset: Vec3) {
        self.last.position -= local_offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_orientation_folds_large_angles() {
        let mut heading = Heading::default();
        heading.set_orientation(Vec3::new(270.0, 90.0, 540.0));
        assert_eq!(heading.orientation(), Vec3::new(-90.0, 90.0, -540.0));
    }

    #[test]
    fn test_point_position_follows_yaw() {
        let mut heading = Heading::default();
        heading.set_orientation(Vec3::new(0.0, 90.0, 0.0));
        let p = heading.point_position(2.0);
        assert!((p - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_continue_from_point_uses_outgoing_handle() {
        let mut heading = Heading::default();
        let mut point = ControlPoint::new(Vec3::ZERO);
        point.set_tangent2_mirrored(Vec3::new(1.0, 0.0, 0.0));
        heading.continue_from_point(&point);
        assert!((heading.orientation().y - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_write_points_straight_line() {
        let mut heading = Heading::default();
        heading.initialize();
        let frame = SegmentFrame::detached(3, 1.0);
        let mut targets = vec![ControlPoint::default(); 3];
        heading.before_generation(&frame, &targets, &ControlPoint::origin());
        for i in 0..3 {
            let mut p = heading.base_point();
            if i > 0 {
                p.position = heading.point_position(1.0);
            }
            heading.record(i, p);
        }
        heading.write_points(&frame, &mut targets);
        assert!((targets[2].position - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
        assert!((targets[1].tangent2 - targets[1].position).normalize().dot(Vec3::Z) > 0.999);
        assert_eq!(targets[1].normal, Vec3::Y);
    }
}
