//! Per-object extrusion settings

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Whether an object and its children take part in extrusion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indexing {
    #[default]
    Normal,
    /// Skip this object, keep its children
    Ignore,
    /// Extrude this object, skip its children
    IgnoreChildren,
    IgnoreAll,
}

/// What happens to an object's collision mesh
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshColliderHandling {
    /// Leave the collision mesh untouched
    #[default]
    Bypass,
    /// Bend it like the render mesh
    Extrude,
    /// Reuse the bent render mesh as collision mesh
    Copy,
}

/// Bit set selecting which parts of an object contribute to segment bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsInclusion(pub u8);

impl BoundsInclusion {
    pub const NONE: BoundsInclusion = BoundsInclusion(0);
    pub const TRANSFORM: BoundsInclusion = BoundsInclusion(1);
    pub const MESH: BoundsInclusion = BoundsInclusion(2);
    pub const SPRITE: BoundsInclusion = BoundsInclusion(4);
    pub const COLLIDER: BoundsInclusion = BoundsInclusion(8);
    pub const ALL: BoundsInclusion = BoundsInclusion(0xFF);

    pub fn contains(self, other: BoundsInclusion) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for BoundsInclusion {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for BoundsInclusion {
    type Output = BoundsInclusion;

    fn bitor(self, rhs: Self) -> Self::Output {
        BoundsInclusion(self.0 | rhs.0)
    }
}

/// How a single object is mapped onto the segment path
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrusionSettings {
    pub indexing: Indexing,
    pub apply_rotation: bool,
    pub keep_upright: bool,
    pub up_vector: Vec3,
    pub apply_scale: bool,
    pub bend_mesh: bool,
    pub bend_sprite: bool,
    pub apply_mesh_colors: bool,
    pub mesh_collider_handling: MeshColliderHandling,
    pub bounds_inclusion: BoundsInclusion,
}

impl Default for ExtrusionSettings {
    fn default() -> Self {
        Self {
            indexing: Indexing::Normal,
            apply_rotation: true,
            keep_upright: false,
            up_vector: Vec3::Y,
            apply_scale: false,
            bend_mesh: false,
            bend_sprite: false,
            apply_mesh_colors: false,
            mesh_collider_handling: MeshColliderHandling::Bypass,
            bounds_inclusion: BoundsInclusion::ALL,
        }
    }
}

impl ExtrusionSettings {
    pub fn ignore(&self) -> bool {
        matches!(self.indexing, Indexing::Ignore | Indexing::IgnoreAll)
    }

    pub fn ignore_children(&self) -> bool {
        matches!(self.indexing, Indexing::IgnoreChildren | Indexing::IgnoreAll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_flags() {
        let mut s = ExtrusionSettings::default();
        assert!(!s.ignore() && !s.ignore_children());
        s.indexing = Indexing::IgnoreAll;
        assert!(s.ignore() && s.ignore_children());
        s.indexing = Indexing::IgnoreChildren;
        assert!(!s.ignore() && s.ignore_children());
    }

    #[test]
    fn test_bounds_inclusion_bits() {
        let inc = BoundsInclusion::TRANSFORM | BoundsInclusion::MESH;
        assert!(inc.contains(BoundsInclusion::MESH));
        assert!(!inc.contains(BoundsInclusion::SPRITE));
        assert!(BoundsInclusion::ALL.contains(BoundsInclusion::COLLIDER));
    }
}
