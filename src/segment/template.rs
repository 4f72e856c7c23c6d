//! Segment templates: authored, instantiable geometry units

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::math::{Aabb, Transform};
use crate::path::PathRule;
use super::builder::BuilderFactory;
use super::lane::LaneSource;
use super::object::ObjectSource;

/// Local axis a segment is extruded along
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Extruded segments are bent along the generated path. Custom segments keep
/// their authored shape and are placed by aligning `entrance` with the track end.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum SegmentType {
    #[default]
    Extruded,
    Custom {
        /// Entrance frame relative to the segment root
        entrance: Transform,
        /// Exit frame relative to the segment root
        exit: Transform,
        #[serde(default)]
        keep_upright: bool,
    },
}

/// Authored segment
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentTemplate {
    pub name: String,
    pub kind: SegmentType,
    pub axis: Axis,
    pub objects: Vec<ObjectSource>,
    pub lanes: Vec<LaneSource>,
    /// Lane used instead of the main path for track queries
    pub main_lane: Option<usize>,
    pub path_rules: Vec<PathRule>,
    #[serde(skip)]
    pub builders: Vec<BuilderFactory>,
}

impl SegmentTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Straight extruded segment whose bounds run from 0 to `length` along Z
    pub fn straight(name: impl Into<String>, width: f32, length: f32) -> Self {
        let mut template = Self::new(name);
        template.objects.push(ObjectSource::new(
            "start",
            Transform::from_position_rotation(Vec3::new(-width * 0.5, 0.0, 0.0), Default::default()),
        ));
        template.objects.push(ObjectSource::new(
            "end",
            Transform::from_position_rotation(Vec3::new(width * 0.5, 0.0, length), Default::default()),
        ));
        template
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, SegmentType::Custom { .. })
    }

    /// Objects that take part in extrusion
    ///
    /// Children of an object whose settings ignore children are skipped, as
    /// are all of their descendants.
    pub fn collected_objects(&self) -> Vec<usize> {
        (0..self.objects.len())
            .filter(|&i| !self.has_ignoring_ancestor(i))
            .collect()
    }

    fn has_ignoring_ancestor(&self, index: usize) -> bool {
        let mut current = self.objects[index].parent;
        let mut depth = 0;
        while let Some(parent) = current {
            // Guard against authored parent cycles
            if depth > self.objects.len() {
                return false;
            }
            let Some(object) = self.objects.get(parent) else {
                return false;
            };
            if object.settings().ignore_children() {
                return true;
            }
            current = object.parent;
            depth += 1;
        }
        false
    }

    /// Local bounds: starts at the origin and grows by the included parts of
    /// every collected object. Lanes do not contribute.
    pub fn compute_bounds(&self) -> Aabb {
        let mut bounds = Aabb::from_point(Vec3::ZERO);
        for i in self.collected_objects() {
            self.objects[i].expand_bounds(&mut bounds);
        }
        bounds
    }
}
