//! Stateful path generator: turns a segment into spline control points
//!
//! The generator works in the space of the track owner (`TrackContext::owner`)
//! and carries the last emitted control point from one segment to the next so
//! consecutive segments join without a seam.

use serde::{Deserialize, Serialize};

use crate::core::types::{Quat, Vec3, WHITE};
use crate::math::Transform;
use crate::segment::Segment;
use crate::spline::{ControlPoint, Sample, Spline, SplineKind};
use super::strategy::PathStrategy;

/// State shared with everything that places track geometry
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackContext {
    /// Transform of the track owner; generators work in its local space
    pub owner: Transform,
    /// Last sample of the newest segment, world space
    pub track_end: Option<Sample>,
}

/// What a new segment needs to know about the one before it
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SegmentLink {
    /// Last path sample, world space
    pub end: Option<Sample>,
    /// Exit frame when the previous segment is custom, world space
    pub custom_exit: Option<Transform>,
}

impl SegmentLink {
    pub fn of(segment: &Segment) -> Self {
        Self {
            end: segment.end_sample(),
            custom_exit: segment.custom_exit(),
        }
    }
}

/// Per-segment inputs handed to the strategies
#[derive(Clone, Debug)]
pub struct SegmentFrame {
    pub owner: Transform,
    pub point_distance: f32,
    pub point_count: usize,
    pub has_previous: bool,
    /// Cleared by strategies that move the segment away from the previous end
    pub stitch: bool,
    pub is_new_level: bool,
    pub previous_end: Option<Sample>,
    /// Exit of a previous custom segment, generator space
    pub previous_exit: Option<Transform>,
}

impl SegmentFrame {
    /// Frame for a first segment under an identity owner
    pub fn detached(point_count: usize, point_distance: f32) -> Self {
        Self {
            owner: Transform::IDENTITY,
            point_distance,
            point_count,
            has_previous: false,
            stitch: true,
            is_new_level: false,
            previous_end: None,
            previous_exit: None,
        }
    }
}

/// Generates one spline per segment with a pluggable [`PathStrategy`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathGenerator {
    pub control_points_per_segment: usize,
    pub spline_kind: SplineKind,
    pub sample_rate: usize,
    pub strategy: PathStrategy,
    #[serde(skip)]
    last_point: ControlPoint,
    #[serde(skip)]
    level: Option<usize>,
    #[serde(skip)]
    is_new_level: bool,
}

impl Default for PathGenerator {
    fn default() -> Self {
        Self::new(PathStrategy::Fixed)
    }
}

impl PathGenerator {
    pub fn new(strategy: PathStrategy) -> Self {
        Self {
            control_points_per_segment: 5,
            spline_kind: SplineKind::Bezier,
            sample_rate: 10,
            strategy,
            last_point: ControlPoint::origin(),
            level: None,
            is_new_level: false,
        }
    }

    /// Last emitted control point, generator space
    pub fn last_point(&self) -> &ControlPoint {
        &self.last_point
    }

    pub fn level(&self) -> Option<usize> {
        self.level
    }

    /// Restart generation from the owner origin
    pub fn initialize(&mut self, ctx: &TrackContext) {
        self.level = None;
        self.is_new_level = false;
        self.last_point = ControlPoint {
            position: Vec3::ZERO,
            tangent: Vec3::Z,
            tangent2: Vec3::ZERO,
            normal: Vec3::Y,
            size: 1.0,
            color: WHITE,
        };
        self.strategy.initialize(ctx);
    }

    /// Hand the carried state of `previous` over to this generator
    pub fn continue_from(&mut self, previous: &PathGenerator, ctx: &TrackContext) {
        self.level = previous.level;
        self.is_new_level = previous.is_new_level;
        self.last_point = previous.last_point;
        self.strategy.continue_from(&previous.strategy, &previous.last_point, ctx);
    }

    /// Re-anchor on the final control point of a live segment
    pub fn continue_from_segment(&mut self, segment: &Segment, ctx: &TrackContext) {
        self.level = Some(segment.level);
        if let Some(exit) = segment.custom_exit() {
            self.last_point = exit_point(&exit, 1.0).inverse_transformed(&ctx.owner);
        } else if let Some(point) = segment.path.spline().points.last() {
            self.last_point = point.inverse_transformed(&ctx.owner);
        }
        self.strategy.continue_from_segment(segment, &ctx.owner);
    }

    /// Distance between consecutive control points of `segment`
    pub fn point_distance(&self, segment: &Segment) -> f32 {
        let count = self.control_points_per_segment.max(2);
        segment.axis().component(segment.bounds.size()) / (count - 1) as f32
    }

    /// Generate and commit the path of `segment`
    ///
    /// Custom segments are only used to move the carried point onto their
    /// exit; they keep their authored shape and get no spline.
    pub fn generate_path(&mut self, segment: &mut Segment, previous: Option<SegmentLink>, ctx: &TrackContext) {
        self.control_points_per_segment = self.control_points_per_segment.max(2);
        if self.level != Some(segment.level) {
            self.is_new_level = true;
            self.level = Some(segment.level);
        }

        if let Some(exit) = segment.custom_exit() {
            self.last_point = exit_point(&exit, 1.0).inverse_transformed(&ctx.owner);
            self.is_new_level = false;
            return;
        }

        let count = self.control_points_per_segment;
        let distance = self.point_distance(segment);
        let mut points = vec![ControlPoint::default(); count];
        let mut start = 0;
        let mut previous_exit = None;
        if let Some(link) = &previous {
            if let Some(exit) = &link.custom_exit {
                points[0] = exit_point(exit, distance / 3.0).inverse_transformed(&ctx.owner);
                previous_exit = Some(Transform::from_position_rotation(
                    ctx.owner.inverse_transform_point(exit.position),
                    ctx.owner.rotation.inverse() * exit.rotation,
                ));
            } else {
                points[0] = self.last_point;
            }
            start = 1;
        }

        let mut frame = SegmentFrame {
            owner: ctx.owner,
            point_distance: distance,
            point_count: count,
            has_previous: previous.is_some(),
            stitch: segment.stitch,
            is_new_level: self.is_new_level,
            previous_end: previous.and_then(|link| link.end),
            previous_exit,
        };

        self.strategy.before_generation(&frame, &points, &self.last_point);
        for rule in &segment.template.path_rules {
            rule.before_generation(&mut self.strategy);
        }
        for i in start..count {
            let first = i == 0 && previous.is_none();
            let point = self.strategy.generate_point(&frame, i, first, &self.last_point);
            points[i] = point;
            self.last_point = point;
        }
        self.strategy.post_generation(&mut frame, &mut points);
        for rule in &segment.template.path_rules {
            rule.post_generation(&mut points);
        }

        self.last_point = points[count - 1];
        self.is_new_level = false;

        for point in &mut points {
            *point = point.transformed(&ctx.owner);
        }
        segment.stitch = frame.stitch;
        segment.set_spline(Spline::new(points, self.spline_kind, self.sample_rate));
        log::trace!(
            "Generated {} control points for segment {} ({})",
            count,
            segment.index,
            self.strategy.name()
        );
    }

    /// Follow a floating origin shift of `offset` in world space
    pub fn shift_origin(&mut self, offset: Vec3, ctx: &TrackContext) {
        let local = ctx.owner.inverse_transform_direction(offset);
        self.last_point.translate(-local);
        self.strategy.shift_origin(local);
    }
}

/// Control point sitting on a custom exit frame, handles `handle` long
fn exit_point(exit: &Transform, handle: f32) -> ControlPoint {
    let forward = exit.forward();
    ControlPoint {
        position: exit.position,
        tangent: exit.position - forward * handle,
        tangent2: exit.position + forward * handle,
        normal: exit.up(),
        size: 1.0,
        color: WHITE,
    }
}

/// Symmetric-difference handles for every point from `start` on
///
/// Missing neighbours at either end are extrapolated from the local curvature.
pub fn auto_tangents(points: &mut [ControlPoint], start: usize) {
    let n = points.len();
    if n < 2 {
        return;
    }
    for i in start..n {
        let prev = if i > 0 {
            points[i - 1].position
        } else if n > 2 {
            extrapolate_point(points[2].position, points[1].position, points[0].position)
        } else {
            points[0].position + (points[0].position - points[1].position)
        };
        let next = if i + 1 < n {
            points[i + 1].position
        } else if n > 2 {
            extrapolate_point(points[i - 2].position, points[i - 1].position, points[i].position)
        } else {
            points[i].position + (points[i].position - points[i - 1].position)
        };
        let delta = (next - prev) / 2.0;
        points[i].tangent = points[i].position - delta / 3.0;
        points[i].tangent2 = points[i].position + delta / 3.0;
    }
}

/// Point that continues the turn through `p1`, `p2`, `p3`
pub fn extrapolate_point(p1: Vec3, p2: Vec3, p3: Vec3) -> Vec3 {
    let v1 = p2 - p1;
    let v2 = p3 - p2;
    let axis = v1.cross(v2);
    let rotation = if axis.length_squared() < 1e-12 {
        Quat::IDENTITY
    } else {
        Quat::from_axis_angle(axis.normalize(), v1.angle_between(v2))
    };
    p3 + rotation * v2.normalize_or_zero() * (v1 + v2).length() * 0.5
}
