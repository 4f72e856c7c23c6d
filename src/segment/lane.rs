//! Named secondary paths inside a segment (lanes)

use serde::{Deserialize, Serialize};

use crate::core::types::{Color, Vec3, WHITE};
use crate::math::{Aabb, Transform};
use crate::spline::{ControlPoint, Spline, SplineKind, SplinePath};
use super::template::Axis;

fn default_sample_rate() -> usize {
    10
}

/// Authored lane: control points in segment-local space
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaneSource {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: Color,
    /// Keep the original handle offsets at both ends so lanes join cleanly
    #[serde(default)]
    pub seamless_ends: bool,
    pub points: Vec<ControlPoint>,
    #[serde(default)]
    pub kind: SplineKind,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: usize,
}

fn default_color() -> Color {
    WHITE
}

impl LaneSource {
    pub fn new(name: impl Into<String>, points: Vec<ControlPoint>) -> Self {
        Self {
            name: name.into(),
            color: WHITE,
            seamless_ends: false,
            points,
            kind: SplineKind::Bezier,
            sample_rate: default_sample_rate(),
        }
    }

    /// Two-point lane running through the middle of `bounds` along `axis`
    pub fn spanning(name: impl Into<String>, bounds: &Aabb, axis: Axis) -> Self {
        let size = bounds.size();
        let (dir, length, normal) = match axis {
            Axis::X => (Vec3::X, size.x, Vec3::Y),
            Axis::Y => (Vec3::Y, size.y, -Vec3::Z),
            Axis::Z => (Vec3::Z, size.z, Vec3::Y),
        };
        let make = |pos: Vec3| {
            let mut p = ControlPoint::new(pos);
            p.normal = normal;
            p.set_tangent_mirrored(pos - dir * length / 3.0);
            p
        };
        let points = vec![make(-dir * length * 0.5), make(dir * length * 0.5)];
        Self::new(name, points)
    }

    /// Two-point lane from an entrance frame to an exit frame, both segment-local
    pub fn between(name: impl Into<String>, entrance: &Transform, exit: &Transform) -> Self {
        let distance = entrance.position.distance(exit.position);
        let make = |frame: &Transform| {
            let mut p = ControlPoint::new(frame.position);
            p.normal = frame.up();
            p.set_tangent_mirrored(frame.position - frame.forward() * distance / 3.0);
            p
        };
        Self::new(name, vec![make(entrance), make(exit)])
    }

    pub fn spline(&self) -> Spline {
        Spline::new(self.points.clone(), self.kind, self.sample_rate)
    }
}

/// Lane of an instantiated segment, in world space
#[derive(Clone, Debug, Default)]
pub struct Lane {
    pub name: String,
    pub color: Color,
    pub path: SplinePath,
}

impl Lane {
    pub fn from_source(source: &LaneSource) -> Self {
        Self {
            name: source.name.clone(),
            color: source.color,
            path: SplinePath::default(),
        }
    }

    /// Lane placed rigidly with the segment transform, no bending
    pub fn placed(source: &LaneSource, transform: &Transform) -> SplinePath {
        let mut spline = source.spline();
        spline.transform(transform);
        SplinePath::new(spline)
    }
}
