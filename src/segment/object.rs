//! Objects placed inside a segment and their extrusion results

use serde::{Deserialize, Serialize};

use crate::core::types::{Color, Vec3};
use crate::math::{Aabb, Transform};
use super::settings::{BoundsInclusion, ExtrusionSettings, MeshColliderHandling};

/// Triangle mesh in object-local space
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    #[serde(default)]
    pub colors: Vec<Color>,
    #[serde(default)]
    pub triangles: Vec<u32>,
}

impl Mesh {
    /// Empty the mesh, keeping its allocations
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.normals.clear();
        self.colors.clear();
        self.triangles.clear();
    }

    /// Overwrite with `other`, reusing this mesh's allocations
    pub fn copy_from(&mut self, other: &Mesh) {
        self.clear();
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.colors.extend_from_slice(&other.colors);
        self.triangles.extend_from_slice(&other.triangles);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Axis-aligned quad in the XZ plane, subdivided `divisions` times along Z
    pub fn strip(width: f32, length: f32, divisions: usize) -> Self {
        let divisions = divisions.max(1);
        let mut mesh = Mesh::default();
        for i in 0..=divisions {
            let z = length * i as f32 / divisions as f32;
            mesh.vertices.push(Vec3::new(-width * 0.5, 0.0, z));
            mesh.vertices.push(Vec3::new(width * 0.5, 0.0, z));
            mesh.normals.push(Vec3::Y);
            mesh.normals.push(Vec3::Y);
        }
        for i in 0..divisions as u32 {
            let a = i * 2;
            mesh.triangles.extend_from_slice(&[a, a + 2, a + 1, a + 1, a + 2, a + 3]);
        }
        mesh
    }
}

/// Authored object of a segment template
///
/// `transform` is relative to the segment root. `None` marks a broken
/// reference; such objects are flagged errored and skipped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectSource {
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    /// The segment root itself; its own rotation is not re-applied after extrusion
    #[serde(default)]
    pub is_root: bool,
    pub transform: Option<Transform>,
    #[serde(default)]
    pub mesh: Option<Mesh>,
    #[serde(default)]
    pub collision_mesh: Option<Mesh>,
    #[serde(default)]
    pub sprite_vertices: Vec<Vec3>,
    #[serde(default)]
    pub settings: ExtrusionSettings,
    /// Shared settings component; wins over `settings` unless overridden
    #[serde(default)]
    pub settings_component: Option<ExtrusionSettings>,
    #[serde(default)]
    pub override_settings: bool,
}

impl ObjectSource {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            parent: None,
            is_root: false,
            transform: Some(transform),
            mesh: None,
            collision_mesh: None,
            sprite_vertices: Vec::new(),
            settings: ExtrusionSettings::default(),
            settings_component: None,
            override_settings: false,
        }
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self.settings.bend_mesh = true;
        self
    }

    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn settings(&self) -> &ExtrusionSettings {
        match &self.settings_component {
            Some(component) if !self.override_settings => component,
            _ => &self.settings,
        }
    }

    /// Grow `bounds` by the parts selected in this object's bounds inclusion
    pub fn expand_bounds(&self, bounds: &mut Aabb) {
        let Some(transform) = &self.transform else {
            return;
        };
        let inclusion = self.settings().bounds_inclusion;
        if inclusion.contains(BoundsInclusion::TRANSFORM) {
            bounds.expand(transform.position);
        }
        if inclusion.contains(BoundsInclusion::MESH) {
            if let Some(mesh) = &self.mesh {
                for v in &mesh.vertices {
                    bounds.expand(transform.transform_point(*v));
                }
            }
        }
        if inclusion.contains(BoundsInclusion::SPRITE) {
            for v in &self.sprite_vertices {
                bounds.expand(transform.transform_point(*v));
            }
        }
        if inclusion.contains(BoundsInclusion::COLLIDER) {
            if let Some(mesh) = &self.collision_mesh {
                for v in &mesh.vertices {
                    bounds.expand(transform.transform_point(*v));
                }
            }
        }
    }
}

/// Runtime state of one object in an instantiated segment
#[derive(Clone, Debug)]
pub struct SegmentObject {
    /// Index into the template's object list
    pub source: usize,
    pub name: String,
    pub parent: Option<usize>,
    pub active: bool,
    pub errored: bool,
    /// Resolved settings, adjusted to what the object actually has
    pub settings: ExtrusionSettings,
    /// World transform after extrusion
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub collision_mesh: Option<Mesh>,
    pub sprite_vertices: Vec<Vec3>,
}

impl SegmentObject {
    pub fn from_source(index: usize, source: &ObjectSource) -> Self {
        Self {
            source: index,
            name: source.name.clone(),
            parent: source.parent,
            active: true,
            errored: false,
            settings: source.settings().clone(),
            transform: source.transform.unwrap_or_default(),
            mesh: None,
            collision_mesh: None,
            sprite_vertices: Vec::new(),
        }
    }

    /// Reset runtime state ahead of extrusion
    ///
    /// Flags the object errored when its source transform is missing and
    /// turns off bending for parts the object does not have.
    pub fn runtime_initialize(&mut self, source: &ObjectSource) {
        self.settings = source.settings().clone();
        if source.transform.is_none() {
            if !self.errored {
                log::warn!("Object '{}' has no transform and will not be extruded", self.name);
            }
            self.errored = true;
            return;
        }
        if source.mesh.is_none() {
            self.settings.bend_mesh = false;
        }
        if source.sprite_vertices.is_empty() {
            self.settings.bend_sprite = false;
        }
        if source.collision_mesh.is_none()
            && self.settings.mesh_collider_handling == MeshColliderHandling::Extrude
        {
            self.settings.mesh_collider_handling = MeshColliderHandling::Bypass;
        }
    }

    /// Back to the authored state of `source` for reuse
    ///
    /// Bent geometry is emptied but its buffers stay allocated.
    pub fn reset(&mut self, source: &ObjectSource) {
        self.active = true;
        self.errored = false;
        self.settings = source.settings().clone();
        self.transform = source.transform.unwrap_or_default();
        if let Some(mesh) = &mut self.mesh {
            mesh.clear();
        }
        if let Some(mesh) = &mut self.collision_mesh {
            mesh.clear();
        }
        self.sprite_vertices.clear();
    }

    /// Store an extrusion result
    pub fn apply(&mut self, result: ObjectResult) {
        if self.errored || self.settings.ignore() {
            return;
        }
        self.transform = result.transform;
        if self.settings.bend_mesh {
            overwrite(&mut self.mesh, result.mesh);
        }
        if self.settings.bend_sprite {
            self.sprite_vertices.clear();
            self.sprite_vertices.extend_from_slice(&result.sprite_vertices);
        }
        match self.settings.mesh_collider_handling {
            MeshColliderHandling::Extrude => overwrite(&mut self.collision_mesh, result.collision_mesh),
            MeshColliderHandling::Copy => overwrite(&mut self.collision_mesh, self.mesh.clone()),
            MeshColliderHandling::Bypass => {}
        }
    }
}

fn overwrite(target: &mut Option<Mesh>, value: Option<Mesh>) {
    if let (Some(existing), Some(mesh)) = (target.as_mut(), value.as_ref()) {
        existing.copy_from(mesh);
    } else {
        *target = value;
    }
}

/// Output of extruding one object
#[derive(Clone, Debug, Default)]
pub struct ObjectResult {
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub collision_mesh: Option<Mesh>,
    pub sprite_vertices: Vec<Vec3>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_component_resolution() {
        let mut source = ObjectSource::new("a", Transform::IDENTITY);
        let mut component = ExtrusionSettings::default();
        component.apply_scale = true;
        source.settings_component = Some(component);
        assert!(source.settings().apply_scale);
        source.override_settings = true;
        assert!(!source.settings().apply_scale);
    }

    #[test]
    fn test_missing_transform_marks_errored() {
        let mut source = ObjectSource::new("broken", Transform::IDENTITY);
        source.transform = None;
        let mut object = SegmentObject::from_source(0, &source);
        object.runtime_initialize(&source);
        assert!(object.errored);
    }

    #[test]
    fn test_bend_disabled_without_mesh() {
        let mut source = ObjectSource::new("a", Transform::IDENTITY);
        source.settings.bend_mesh = true;
        source.settings.mesh_collider_handling = MeshColliderHandling::Extrude;
        let mut object = SegmentObject::from_source(0, &source);
        object.runtime_initialize(&source);
        assert!(!object.settings.bend_mesh);
        assert_eq!(object.settings.mesh_collider_handling, MeshColliderHandling::Bypass);
    }

    #[test]
    fn test_apply_reuses_mesh_buffers() {
        let mut source = ObjectSource::new("strip", Transform::IDENTITY).with_mesh(Mesh::strip(2.0, 10.0, 8));
        source.settings.bend_mesh = true;
        let mut object = SegmentObject::from_source(0, &source);
        object.runtime_initialize(&source);
        object.apply(ObjectResult { mesh: Some(Mesh::strip(2.0, 10.0, 8)), ..Default::default() });
        let capacity = object.mesh.as_ref().map_or(0, |m| m.vertices.capacity());
        assert_eq!(object.mesh.as_ref().map(Mesh::vertex_count), Some(18));

        object.reset(&source);
        assert_eq!(object.mesh.as_ref().map(Mesh::vertex_count), Some(0));
        object.runtime_initialize(&source);
        object.apply(ObjectResult { mesh: Some(Mesh::strip(2.0, 10.0, 2)), ..Default::default() });
        let mesh = object.mesh.as_ref().unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.vertices.capacity(), capacity);
    }

    #[test]
    fn test_expand_bounds_uses_mesh() {
        let source = ObjectSource::new("strip", Transform::IDENTITY).with_mesh(Mesh::strip(2.0, 10.0, 4));
        let mut bounds = Aabb::from_point(Vec3::ZERO);
        source.expand_bounds(&mut bounds);
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 0.0, 10.0));
    }
}
