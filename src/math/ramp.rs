//! Keyframe interpolation over a normalized 0..1 range.
//!
//! [`Ramp`] is used wherever a path generator needs a value that varies with
//! progress through a segment: control point sizes, colors, and so on.

use serde::{Deserialize, Serialize};

use crate::core::types::{Vec3, Vec4};

// ---------------------------------------------------------------------------
// Lerp trait
// ---------------------------------------------------------------------------

/// Trait for types that can be linearly interpolated.
pub trait Lerp: Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    #[inline]
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *other, t)
    }
}

impl Lerp for Vec4 {
    #[inline]
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec4::lerp(*self, *other, t)
    }
}

// ---------------------------------------------------------------------------
// Ramp
// ---------------------------------------------------------------------------

/// Keyframe-based value ramp over 0..1.
///
/// Keys are `(position, value)` pairs sorted by position. Sampling clamps to
/// the first and last keys outside their range.
#[derive(Clone, Debug)]
pub struct Ramp<T: Lerp> {
    keys: Vec<(f32, T)>,
}

impl<T: Lerp> Ramp<T> {
    /// Create a new ramp from unsorted keys. Keys are sorted by position.
    pub fn new(mut keys: Vec<(f32, T)>) -> Self {
        keys.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Self { keys }
    }

    /// Create a constant ramp that always returns the same value.
    pub fn constant(value: T) -> Self {
        Self {
            keys: vec![(0.0, value)],
        }
    }

    /// Two-key ramp from `start` at 0 to `end` at 1
    pub fn linear(start: T, end: T) -> Self {
        Self {
            keys: vec![(0.0, start), (1.0, end)],
        }
    }

    /// Sample the ramp at `t`, clamped to the key range.
    ///
    /// Returns `None` for a ramp without keys.
    pub fn sample(&self, t: f32) -> Option<T> {
        let first = self.keys.first()?;
        if self.keys.len() == 1 || t <= first.0 {
            return Some(first.1.clone());
        }

        match self.keys.iter().position(|k| k.0 > t) {
            Some(idx) => {
                let (t_a, ref v_a) = self.keys[idx - 1];
                let (t_b, ref v_b) = self.keys[idx];
                let span = t_b - t_a;
                if span < 1e-6 {
                    return Some(v_a.clone());
                }
                Some(v_a.lerp(v_b, (t - t_a) / span))
            }
            None => self.keys.last().map(|k| k.1.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde support
// ---------------------------------------------------------------------------

impl<T: Lerp + Serialize> Serialize for Ramp<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.keys.serialize(serializer)
    }
}

impl<'de, T: Lerp + Deserialize<'de>> Deserialize<'de> for Ramp<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<(f32, T)>::deserialize(deserializer)?;
        Ok(Self::new(keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_constant() {
        let ramp = Ramp::constant(0.5_f32);
        assert_eq!(ramp.sample(0.0), Some(0.5));
        assert_eq!(ramp.sample(1.0), Some(0.5));
    }

    #[test]
    fn test_empty_ramp_samples_none() {
        let ramp: Ramp<f32> = Ramp::new(Vec::new());
        assert_eq!(ramp.sample(0.5), None);
    }

    #[test]
    fn test_multi_key_and_clamping() {
        let ramp = Ramp::new(vec![(1.0, 2.0_f32), (0.0, 0.0), (0.5, 1.0)]);
        assert!(approx_eq_f32(ramp.sample(0.25).unwrap(), 0.5, 1e-5));
        assert!(approx_eq_f32(ramp.sample(0.75).unwrap(), 1.5, 1e-5));
        assert_eq!(ramp.sample(-1.0), Some(0.0));
        assert_eq!(ramp.sample(3.0), Some(2.0));
    }

    #[test]
    fn test_color_ramp_midpoint() {
        let ramp = Ramp::linear(Vec4::ZERO, Vec4::ONE);
        let mid = ramp.sample(0.5).unwrap();
        assert!((mid - Vec4::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_serde_sorts_keys() {
        let ramp: Ramp<f32> = serde_json::from_str("[[1.0, 4.0], [0.0, 2.0]]").unwrap();
        assert_eq!(ramp.sample(0.5), Some(3.0));
    }
}
