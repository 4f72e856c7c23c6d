//! Authored spline replayed slice by slice

use serde::{Deserialize, Serialize};

use crate::core::types::{Percent, Vec3};
use crate::math::Transform;
use crate::spline::{ControlPoint, EvaluateMode, Sample, Spline, SplineKind, SplinePath};
use super::generator::TrackContext;

/// Replays a fixed spline, one slice per segment
///
/// The spline is resampled at uniform arclength on `initialize`. Segment `i`
/// consumes the slice `i % segment_count` of the whole curve. With
/// `relative` set, the curve is placed at the track end that existed when the
/// strategy was initialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomPath {
    pub points: Vec<ControlPoint>,
    pub kind: SplineKind,
    pub sample_rate: usize,
    pub closed: bool,
    pub relative: bool,
    pub segment_count: usize,
    #[serde(skip)]
    path: SplinePath,
    #[serde(skip)]
    segment_index: usize,
    #[serde(skip)]
    placement: Transform,
}

impl Default for CustomPath {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            kind: SplineKind::CatmullRom,
            sample_rate: 10,
            closed: false,
            relative: false,
            segment_count: 10,
            path: SplinePath::default(),
            segment_index: 0,
            placement: Transform::IDENTITY,
        }
    }
}

impl CustomPath {
    pub fn new(points: Vec<ControlPoint>, segment_count: usize) -> Self {
        Self {
            points,
            segment_count,
            ..Default::default()
        }
    }

    /// Rebuild the resampled curve and restart from the first slice
    pub fn initialize(&mut self, ctx: &TrackContext) {
        self.segment_index = 0;
        let mut spline = Spline::new(self.points.clone(), self.kind, self.sample_rate);
        spline.closed = self.closed;
        self.path = SplinePath::new(spline);
        self.placement = match (&ctx.track_end, self.relative) {
            (Some(end), true) => Transform::from_position_rotation(
                ctx.owner.inverse_transform_point(end.position),
                ctx.owner.rotation.inverse() * end.rotation(),
            ),
            _ => Transform::IDENTITY,
        };
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    fn evaluate(&self, percent: Percent) -> Sample {
        let sample = self.path.evaluate(percent, EvaluateMode::Cached);
        if self.relative {
            sample.transformed(&self.placement)
        } else {
            sample
        }
    }

    /// Overwrite every point with the next slice of the curve
    pub fn post_generation(&mut self, points: &mut [ControlPoint]) {
        let n = points.len();
        if self.path.is_empty() || n < 2 {
            return;
        }
        let count = self.segment_count.max(1);
        let range = 1.0 / count as f64;
        let slice = self.segment_index % count;
        let from = range * slice as f64;
        let to = range * (slice + 1) as f64;

        let mut directions = Vec::with_capacity(n);
        for (i, point) in points.iter_mut().enumerate() {
            let percent = from + (to - from) * i as f64 / (n - 1) as f64;
            let sample = self.evaluate(percent);
            point.position = sample.position;
            point.normal = sample.up;
            point.size = sample.size;
            point.color = sample.color;
            directions.push(sample.forward);
        }
        for i in 0..n {
            let neighbour = if i == 0 { points[1].position } else { points[i - 1].position };
            let distance = points[i].position.distance(neighbour);
            let tangent2 = points[i].position + directions[i] * distance / 3.0;
            points[i].set_tangent2_mirrored(tangent2);
        }
        self.segment_index += 1;
    }

    pub fn shift_origin(&mut self, local_offset: Vec3) {
        if self.relative {
            self.placement.position -= local_offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> CustomPath {
        let points = vec![
            ControlPoint::new(Vec3::ZERO),
            ControlPoint::new(Vec3::new(0.0, 0.0, 40.0)),
        ];
        let mut custom = CustomPath::new(points, 4);
        custom.kind = SplineKind::Linear;
        custom
    }

    #[test]
    fn test_slices_advance_and_wrap() {
        let mut custom = line();
        custom.initialize(&TrackContext::default());
        let mut points = vec![ControlPoint::default(); 3];
        custom.post_generation(&mut points);
        assert!((points[0].position.z).abs() < 1e-3);
        assert!((points[2].position.z - 10.0).abs() < 1e-3);
        for _ in 0..3 {
            custom.post_generation(&mut points);
        }
        assert!((points[2].position.z - 40.0).abs() < 1e-3);
        custom.post_generation(&mut points);
        assert!((points[2].position.z - 10.0).abs() < 1e-3);
        assert_eq!(custom.segment_index(), 5);
    }

    #[test]
    fn test_relative_placement_at_track_end() {
        let mut custom = line();
        custom.relative = true;
        let ctx = TrackContext {
            owner: Transform::IDENTITY,
            track_end: Some(Sample { position: Vec3::new(5.0, 0.0, 0.0), forward: Vec3::X, ..Default::default() }),
        };
        custom.initialize(&ctx);
        let mut points = vec![ControlPoint::default(); 2];
        custom.post_generation(&mut points);
        assert!((points[0].position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-3);
        assert!((points[1].position - Vec3::new(15.0, 0.0, 0.0)).length() < 1e-3);
    }
}
