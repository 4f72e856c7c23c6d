//! Parametric curve through control points

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::math::Transform;
use super::point::ControlPoint;
use super::sample::Sample;

/// Interpolation used between control points
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplineKind {
    /// Cubic Bezier through each point's outgoing and the next point's incoming handle
    #[default]
    Bezier,
    /// Straight lines between positions
    Linear,
    /// Uniform Catmull-Rom through positions, handles ignored
    CatmullRom,
}

/// Curve over a list of control points, parameterized by `t` in 0..1
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub points: Vec<ControlPoint>,
    pub kind: SplineKind,
    pub closed: bool,
    /// Cached samples per curve span
    pub sample_rate: usize,
}

impl Spline {
    pub fn new(points: Vec<ControlPoint>, kind: SplineKind, sample_rate: usize) -> Self {
        Self {
            points,
            kind,
            closed: false,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Number of curve spans between control points
    pub fn span_count(&self) -> usize {
        match self.points.len() {
            0 | 1 => 0,
            n if self.closed => n,
            n => n - 1,
        }
    }

    /// Number of cached samples a path built over this spline holds
    pub fn iterations(&self) -> usize {
        let spans = self.span_count();
        if spans == 0 {
            return self.points.len().min(1);
        }
        match self.kind {
            SplineKind::Linear => spans + 1,
            _ => self.sample_rate.max(1) * spans + 1,
        }
    }

    fn point(&self, index: isize) -> &ControlPoint {
        let n = self.points.len() as isize;
        let i = if self.closed {
            index.rem_euclid(n)
        } else {
            index.clamp(0, n - 1)
        };
        &self.points[i as usize]
    }

    /// Span index and local parameter for a global `t`
    fn locate(&self, t: f64) -> (usize, f32) {
        let spans = self.span_count();
        let v = t.clamp(0.0, 1.0) * spans as f64;
        let span = (v.floor() as usize).min(spans - 1);
        (span, (v - span as f64) as f32)
    }

    /// Position at parameter `t`
    pub fn evaluate_position(&self, t: f64) -> Vec3 {
        match self.points.len() {
            0 => return Vec3::ZERO,
            1 => return self.points[0].position,
            _ => {}
        }
        let (span, u) = self.locate(t);
        let i = span as isize;
        let a = self.point(i);
        let b = self.point(i + 1);
        match self.kind {
            SplineKind::Linear => a.position.lerp(b.position, u),
            SplineKind::Bezier => bezier(a.position, a.tangent2, b.tangent, b.position, u),
            SplineKind::CatmullRom => {
                let p0 = self.point(i - 1).position;
                let p3 = self.point(i + 2).position;
                catmull_rom(p0, a.position, b.position, p3, u)
            }
        }
    }

    /// First derivative at parameter `t`, not normalized
    pub fn evaluate_derivative(&self, t: f64) -> Vec3 {
        if self.points.len() < 2 {
            return Vec3::Z;
        }
        let (span, u) = self.locate(t);
        let i = span as isize;
        let a = self.point(i);
        let b = self.point(i + 1);
        match self.kind {
            SplineKind::Linear => b.position - a.position,
            SplineKind::Bezier => bezier_derivative(a.position, a.tangent2, b.tangent, b.position, u),
            SplineKind::CatmullRom => {
                let p0 = self.point(i - 1).position;
                let p3 = self.point(i + 2).position;
                catmull_rom_derivative(p0, a.position, b.position, p3, u)
            }
        }
    }

    /// Full sample at parameter `t`
    ///
    /// The up vector is the interpolated control point normal made
    /// perpendicular to the forward direction.
    pub fn evaluate(&self, t: f64) -> Sample {
        match self.points.len() {
            0 => return Sample { percent: t, ..Default::default() },
            1 => {
                let p = &self.points[0];
                return Sample {
                    position: p.position,
                    up: p.normal,
                    size: p.size,
                    color: p.color,
                    percent: t,
                    ..Default::default()
                };
            }
            _ => {}
        }
        let (span, u) = self.locate(t);
        let a = self.point(span as isize);
        let b = self.point(span as isize + 1);

        let mut forward = self.evaluate_derivative(t);
        if forward.length_squared() < 1e-10 {
            // Collapsed handles, fall back to the chord
            forward = b.position - a.position;
        }
        let forward = forward.normalize_or(Vec3::Z);
        let normal = a.normal.lerp(b.normal, u).normalize_or(Vec3::Y);
        let right = normal.cross(forward);
        let up = if right.length_squared() < 1e-10 {
            normal
        } else {
            forward.cross(right).normalize()
        };

        Sample {
            position: self.evaluate_position(t),
            forward,
            up,
            size: a.size + (b.size - a.size) * u,
            color: a.color.lerp(b.color, u),
            percent: t,
        }
    }

    /// Transform every control point in place
    pub fn transform(&mut self, transform: &Transform) {
        for point in &mut self.points {
            *point = point.transformed(transform);
        }
    }
}

fn bezier(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let mt = 1.0 - t;
    p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
}

fn bezier_derivative(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let mt = 1.0 - t;
    (p1 - p0) * (3.0 * mt * mt) + (p2 - p1) * (6.0 * mt * t) + (p3 - p2) * (3.0 * t * t)
}

fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

fn catmull_rom_derivative(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    0.5 * ((p2 - p0)
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * (2.0 * t)
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * (3.0 * t2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(kind: SplineKind) -> Spline {
        let mut a = ControlPoint::new(Vec3::ZERO);
        let mut b = ControlPoint::new(Vec3::new(0.0, 0.0, 9.0));
        a.set_tangent2_mirrored(Vec3::new(0.0, 0.0, 3.0));
        b.set_tangent_mirrored(Vec3::new(0.0, 0.0, 6.0));
        Spline::new(vec![a, b], kind, 10)
    }

    #[test]
    fn test_iterations() {
        let s = straight(SplineKind::Bezier);
        assert_eq!(s.iterations(), 11);
        let s = straight(SplineKind::Linear);
        assert_eq!(s.iterations(), 2);
    }

    #[test]
    fn test_endpoints_interpolated() {
        for kind in [SplineKind::Bezier, SplineKind::Linear, SplineKind::CatmullRom] {
            let s = straight(kind);
            assert!((s.evaluate_position(0.0) - Vec3::ZERO).length() < 1e-5);
            assert!((s.evaluate_position(1.0) - Vec3::new(0.0, 0.0, 9.0)).length() < 1e-5);
        }
    }

    #[test]
    fn test_straight_bezier_is_uniform() {
        let s = straight(SplineKind::Bezier);
        assert!((s.evaluate_position(0.5).z - 4.5).abs() < 1e-4);
        let sample = s.evaluate(0.3);
        assert!((sample.forward - Vec3::Z).length() < 1e-5);
        assert!((sample.up - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_closed_span_count() {
        let mut s = straight(SplineKind::Linear);
        s.points.push(ControlPoint::new(Vec3::new(5.0, 0.0, 5.0)));
        assert_eq!(s.span_count(), 2);
        s.closed = true;
        assert_eq!(s.span_count(), 3);
        assert!((s.evaluate_position(1.0) - Vec3::ZERO).length() < 1e-5);
    }
}
