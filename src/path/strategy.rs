//! Closed set of point placement strategies

use serde::{Deserialize, Serialize};

use crate::core::types::{Vec3, WHITE};
use crate::math::Transform;
use crate::segment::Segment;
use crate::spline::ControlPoint;
use super::custom::CustomPath;
use super::generator::{SegmentFrame, TrackContext, auto_tangents};
use super::heading::Heading;
use super::random::RandomPath;
use super::spiral::SpiralPath;
use super::wavy::WavyPath;

/// How control points are placed
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum PathStrategy {
    /// Straight ahead along the generator's forward axis
    #[default]
    Fixed,
    Random(RandomPath),
    Spiral(SpiralPath),
    Wavy(WavyPath),
    Custom(CustomPath),
}

impl PathStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            PathStrategy::Fixed => "fixed",
            PathStrategy::Random(_) => "random",
            PathStrategy::Spiral(_) => "spiral",
            PathStrategy::Wavy(_) => "wavy",
            PathStrategy::Custom(_) => "custom",
        }
    }

    /// Orientation state, for strategies that step along a heading
    pub fn heading(&self) -> Option<&Heading> {
        match self {
            PathStrategy::Random(random) => Some(&random.heading),
            PathStrategy::Wavy(wavy) => Some(&wavy.heading),
            _ => None,
        }
    }

    fn heading_mut(&mut self) -> Option<&mut Heading> {
        match self {
            PathStrategy::Random(random) => Some(&mut random.heading),
            PathStrategy::Wavy(wavy) => Some(&mut wavy.heading),
            _ => None,
        }
    }

    pub fn initialize(&mut self, ctx: &TrackContext) {
        match self {
            PathStrategy::Fixed => {}
            PathStrategy::Random(random) => random.initialize(ctx),
            PathStrategy::Spiral(spiral) => spiral.initialize(),
            PathStrategy::Wavy(wavy) => wavy.initialize(),
            PathStrategy::Custom(custom) => custom.initialize(ctx),
        }
    }

    /// Take over from the strategy that generated the track so far
    pub fn continue_from(&mut self, previous: &PathStrategy, last_point: &ControlPoint, ctx: &TrackContext) {
        match (self, previous.heading()) {
            (PathStrategy::Random(random), Some(heading)) => random.continue_from_heading(heading),
            (PathStrategy::Random(random), None) => random.continue_from_point(last_point),
            (PathStrategy::Wavy(wavy), Some(heading)) => wavy.heading.continue_from_heading(heading),
            (PathStrategy::Wavy(wavy), None) => wavy.heading.continue_from_point(last_point),
            (PathStrategy::Custom(custom), _) => custom.initialize(ctx),
            _ => {}
        }
    }

    pub fn continue_from_segment(&mut self, segment: &Segment, owner: &Transform) {
        match self {
            PathStrategy::Random(random) => random.continue_from_segment(segment, owner),
            PathStrategy::Wavy(wavy) => wavy.heading.continue_from_segment(segment, owner),
            _ => {}
        }
    }

    pub fn before_generation(&mut self, frame: &SegmentFrame, points: &[ControlPoint], last_point: &ControlPoint) {
        if let Some(heading) = self.heading_mut() {
            heading.before_generation(frame, points, last_point);
        }
    }

    pub fn generate_point(
        &mut self,
        frame: &SegmentFrame,
        index: usize,
        first: bool,
        last_point: &ControlPoint,
    ) -> ControlPoint {
        match self {
            PathStrategy::Random(random) => random.generate_point(frame, index, first, last_point),
            PathStrategy::Spiral(spiral) => spiral.generate_point(frame, first, last_point),
            PathStrategy::Wavy(wavy) => wavy.generate_point(frame, index, first),
            PathStrategy::Fixed | PathStrategy::Custom(_) => forward_point(frame, first, last_point),
        }
    }

    pub fn post_generation(&mut self, frame: &mut SegmentFrame, points: &mut [ControlPoint]) {
        match self {
            PathStrategy::Fixed => {
                let start = if frame.has_previous { 1 } else { 0 };
                auto_tangents(points, start);
            }
            PathStrategy::Random(random) => random.post_generation(frame, points),
            PathStrategy::Spiral(_) => {}
            PathStrategy::Wavy(wavy) => wavy.heading.write_points(frame, points),
            PathStrategy::Custom(custom) => custom.post_generation(points),
        }
    }

    pub fn shift_origin(&mut self, local_offset: Vec3) {
        match self {
            PathStrategy::Custom(custom) => custom.shift_origin(local_offset),
            other => {
                if let Some(heading) = other.heading_mut() {
                    heading.shift_origin(local_offset);
                }
            }
        }
    }
}

/// Point one step ahead of the last one along +Z, normal up
fn forward_point(frame: &SegmentFrame, first: bool, last_point: &ControlPoint) -> ControlPoint {
    let mut position = last_point.position;
    if !first {
        position += Vec3::Z * frame.point_distance;
    }
    ControlPoint {
        position,
        tangent: position,
        tangent2: position,
        normal: Vec3::Y,
        size: 1.0,
        color: WHITE,
    }
}
