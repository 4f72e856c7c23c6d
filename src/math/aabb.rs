//! Axis-aligned bounding box used for segment bounds

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use super::angle::inverse_lerp;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Degenerate AABB sitting on a single point
    pub fn from_point(point: Vec3) -> Self {
        Self { min: point, max: point }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get half-extents
    pub fn half_extent(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Check if point is inside AABB
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Return merged AABB containing both
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Per-axis normalized position of `point` inside the box.
    ///
    /// Each component is clamped to 0..1. A flat axis yields 0.
    pub fn percent_of(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            inverse_lerp(self.min.x, self.max.x, point.x),
            inverse_lerp(self.min.y, self.max.y, point.y),
            inverse_lerp(self.min.z, self.max.z, point.z),
        )
    }

    /// Translate both corners
    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(aabb.center(), Vec3::splat(0.5));
        assert_eq!(aabb.size(), Vec3::ONE);
    }

    #[test]
    fn test_expand_from_point() {
        let mut aabb = Aabb::from_point(Vec3::ZERO);
        aabb.expand(Vec3::new(1.0, -2.0, 10.0));
        assert_eq!(aabb.min, Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 0.0, 10.0));
        assert!(aabb.contains_point(Vec3::new(0.5, -1.0, 5.0)));
    }

    #[test]
    fn test_percent_of_clamps_and_handles_flat_axis() {
        let aabb = Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 10.0));
        let p = aabb.percent_of(Vec3::new(0.0, 5.0, 12.0));
        assert_eq!(p, Vec3::new(0.5, 0.0, 1.0));
    }
}
