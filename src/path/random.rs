//! Random walk over pitch, yaw and roll

use serde::{Deserialize, Serialize};

use crate::core::types::{Color, Vec3};
use crate::core::Randomizer;
use crate::math::angle::{lerp_angle, move_towards, move_towards_angle, wrap_degrees};
use crate::math::{Ramp, Transform};
use crate::segment::Segment;
use crate::spline::ControlPoint;
use super::generator::{SegmentFrame, TrackContext};
use super::heading::{Heading, HeadingPoint};

/// One flag per rotation axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisFlags {
    pub pitch: bool,
    pub yaw: bool,
    pub roll: bool,
}

impl AxisFlags {
    pub const NONE: AxisFlags = AxisFlags { pitch: false, yaw: false, roll: false };
    pub const ALL: AxisFlags = AxisFlags { pitch: true, yaw: true, roll: true };
}

/// Space a random offset is expressed in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetSpace {
    #[default]
    World,
    /// Frame of the previous segment's end
    Local,
}

/// Offset lerped between `min` and `max` with a random t
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetRange {
    pub min: Vec3,
    pub max: Vec3,
    pub space: OffsetSpace,
}

impl OffsetRange {
    pub fn is_zero(&self) -> bool {
        self.min == Vec3::ZERO && self.max == Vec3::ZERO
    }
}

/// Random walk strategy
///
/// Every angle with its `enabled` flag set walks towards a target. Once the
/// target is reached a new one is drawn `target +- step` away and a new turn
/// rate is picked. Restricted axes clamp the target to the orientation range,
/// free axes wrap it around the circle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomPath {
    pub heading: Heading,
    pub randomizer: Randomizer,
    pub enabled: AxisFlags,
    pub restricted: AxisFlags,
    pub min_orientation: Vec3,
    pub max_orientation: Vec3,
    pub min_step: Vec3,
    pub max_step: Vec3,
    pub min_turn_rate: Vec3,
    pub max_turn_rate: Vec3,
    /// Targets used right after initialization for the flagged axes
    pub start_target: Vec3,
    pub use_start_target: AxisFlags,
    pub colors: Option<(Ramp<Color>, Ramp<Color>)>,
    pub sizes: Option<(Ramp<f32>, Ramp<f32>)>,
    pub segment_offset: OffsetRange,
    /// Applied to the first segment of every new level
    pub level_offset: OffsetRange,
    #[serde(skip)]
    turn_rate: Vec3,
    #[serde(skip)]
    target: Vec3,
}

impl Default for RandomPath {
    fn default() -> Self {
        Self {
            heading: Heading::default(),
            randomizer: Randomizer::default(),
            enabled: AxisFlags::NONE,
            restricted: AxisFlags::NONE,
            min_orientation: Vec3::ZERO,
            max_orientation: Vec3::ZERO,
            min_step: Vec3::ZERO,
            max_step: Vec3::ZERO,
            min_turn_rate: Vec3::ZERO,
            max_turn_rate: Vec3::ZERO,
            start_target: Vec3::ZERO,
            use_start_target: AxisFlags::NONE,
            colors: None,
            sizes: None,
            segment_offset: OffsetRange::default(),
            level_offset: OffsetRange::default(),
            turn_rate: Vec3::ZERO,
            target: Vec3::ZERO,
        }
    }
}

impl RandomPath {
    /// Yaw-only walk between `-max_yaw` and `max_yaw`
    pub fn winding(randomizer: Randomizer, max_yaw: f32, max_step: f32, turn_rate: f32) -> Self {
        Self {
            randomizer,
            enabled: AxisFlags { yaw: true, ..AxisFlags::NONE },
            restricted: AxisFlags { yaw: true, ..AxisFlags::NONE },
            min_orientation: Vec3::new(0.0, -max_yaw, 0.0),
            max_orientation: Vec3::new(0.0, max_yaw, 0.0),
            min_step: Vec3::new(0.0, max_step * 0.25, 0.0),
            max_step: Vec3::new(0.0, max_step, 0.0),
            min_turn_rate: Vec3::new(0.0, turn_rate * 0.5, 0.0),
            max_turn_rate: Vec3::new(0.0, turn_rate, 0.0),
            ..Default::default()
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn turn_rate(&self) -> Vec3 {
        self.turn_rate
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn set_target_pitch(&mut self, value: f32) {
        self.target.x = value;
    }

    pub fn set_target_yaw(&mut self, value: f32) {
        self.target.y = value;
    }

    pub fn set_target_roll(&mut self, value: f32) {
        self.target.z = value;
    }

    pub fn set_turn_rate(&mut self, rate: Vec3) {
        self.turn_rate = rate;
    }

    pub fn set_pitch_step(&mut self, value: f32) {
        self.turn_rate.x = value;
    }

    pub fn set_yaw_step(&mut self, value: f32) {
        self.turn_rate.y = value;
    }

    pub fn set_roll_step(&mut self, value: f32) {
        self.turn_rate.z = value;
    }

    pub fn initialize(&mut self, _ctx: &TrackContext) {
        self.heading.initialize();
        self.init_angles();
    }

    pub fn continue_from_heading(&mut self, previous: &Heading) {
        self.heading.continue_from_heading(previous);
        self.init_angles();
    }

    pub fn continue_from_point(&mut self, last_point: &ControlPoint) {
        self.heading.continue_from_point(last_point);
        self.init_angles();
    }

    pub fn continue_from_segment(&mut self, segment: &Segment, owner: &Transform) {
        self.heading.continue_from_segment(segment, owner);
        self.init_angles();
    }

    /// Re-seed and draw fresh turn rates, targeting the current orientation
    fn init_angles(&mut self) {
        self.randomizer.initialize();
        self.turn_rate = Vec3::new(
            self.randomizer.range(self.min_turn_rate.x, self.max_turn_rate.x),
            self.randomizer.range(self.min_turn_rate.y, self.max_turn_rate.y),
            self.randomizer.range(self.min_turn_rate.z, self.max_turn_rate.z),
        );
        self.target = self.heading.orientation();
        if self.use_start_target.yaw {
            self.target.y = self.start_target.y;
        }
        if self.use_start_target.pitch {
            self.target.x = self.start_target.x;
        }
        if self.use_start_target.roll {
            self.target.z = self.start_target.z;
        }
    }

    fn move_orientation(&self, mut input: Vec3) -> Vec3 {
        let step = |restricted: bool, current: f32, target: f32, rate: f32| {
            if restricted {
                move_towards(current, target, rate)
            } else {
                move_towards_angle(current, target, rate)
            }
        };
        input.x = step(self.restricted.pitch, input.x, self.target.x, self.turn_rate.x);
        input.y = step(self.restricted.yaw, input.y, self.target.y, self.turn_rate.y);
        input.z = step(self.restricted.roll, input.z, self.target.z, self.turn_rate.z);
        input
    }

    fn move_target(&mut self, input: f32, min_step: f32, max_step: f32, restrict: bool, min: f32, max: f32) -> f32 {
        let direction = if self.randomizer.range(0.0, 100.0) > 50.0 { 1.0 } else { -1.0 };
        let moved = input + self.randomizer.range(min_step, max_step) * direction;
        if restrict {
            moved.clamp(min, max)
        } else {
            wrap_degrees(moved)
        }
    }

    pub fn generate_point(&mut self, frame: &SegmentFrame, index: usize, first: bool, last_point: &ControlPoint) -> ControlPoint {
        let mut point: HeadingPoint = self.heading.base_point();
        if first {
            point.position = last_point.position;
            point.rotation = self.heading.orientation();
        } else {
            let orientation = self.move_orientation(self.heading.orientation());
            self.heading.turn_to(orientation);

            if self.enabled.yaw && orientation.y == self.target.y {
                self.target.y = self.move_target(
                    self.target.y,
                    self.min_step.y,
                    self.max_step.y,
                    self.restricted.yaw,
                    self.min_orientation.y,
                    self.max_orientation.y,
                );
                self.turn_rate.y = self.randomizer.range(self.min_turn_rate.y, self.max_turn_rate.y);
            }
            if self.enabled.pitch && orientation.x == self.target.x {
                self.target.x = self.move_target(
                    self.target.x,
                    self.min_step.x,
                    self.max_step.x,
                    self.restricted.pitch,
                    self.min_orientation.x,
                    self.max_orientation.x,
                );
                self.turn_rate.x = self.randomizer.range(self.min_turn_rate.x, self.max_turn_rate.x);
            }
            if self.enabled.roll && orientation.z == self.target.z {
                self.target.z = self.move_target(
                    self.target.z,
                    self.min_step.z,
                    self.max_step.z,
                    self.restricted.roll,
                    self.min_orientation.z,
                    self.max_orientation.z,
                );
                self.turn_rate.z = self.randomizer.range(self.min_turn_rate.z, self.max_turn_rate.z);
            }

            let next = self.move_orientation(orientation);
            point.position = self.heading.point_position(frame.point_distance);
            point.rotation.x = lerp_angle(orientation.x, next.x, 0.5);
            point.rotation.y = lerp_angle(orientation.y, next.y, 0.5);
            point.rotation.z = orientation.z;
        }
        point.auto_rotation = false;

        let progress = index as f32 / (frame.point_count.max(2) - 1) as f32;
        if let Some((min, max)) = &self.colors {
            if let (Some(a), Some(b)) = (min.sample(progress), max.sample(progress)) {
                point.color = a.lerp(b, self.randomizer.next_f32());
            }
        }
        if let Some((min, max)) = &self.sizes {
            if let (Some(a), Some(b)) = (min.sample(progress), max.sample(progress)) {
                point.size = a + (b - a) * self.randomizer.next_f32();
            }
        }
        self.heading.record(index, point)
    }

    pub fn post_generation(&mut self, frame: &mut SegmentFrame, points: &mut [ControlPoint]) {
        self.heading.write_points(frame, points);

        if !self.segment_offset.is_zero() {
            let range = self.segment_offset;
            let t = self.randomizer.range(0.0, 1.0);
            offset_points(frame, points, range.min.lerp(range.max, t), range.space);
        }
        if frame.is_new_level && !self.level_offset.is_zero() {
            let range = self.level_offset;
            let t = self.randomizer.range(0.0, 1.0);
            offset_points(frame, points, range.min.lerp(range.max, t), range.space);
        }
    }
}

/// Translate all points. A non-zero offset breaks the weld with the previous segment.
fn offset_points(frame: &mut SegmentFrame, points: &mut [ControlPoint], offset: Vec3, space: OffsetSpace) {
    if offset == Vec3::ZERO {
        return;
    }
    frame.stitch = false;
    let mut world = offset;
    if let (OffsetSpace::Local, Some(end)) = (space, &frame.previous_end) {
        world = end.forward * offset.z + end.right() * offset.x + end.up * offset.y;
    }
    let local = frame.owner.inverse_transform_direction(world);
    for point in points {
        point.translate(local);
    }
}
