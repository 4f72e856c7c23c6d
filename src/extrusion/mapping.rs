//! Mapping of segment-local geometry onto the generated path

use std::sync::Arc;

use rayon::prelude::*;

use crate::core::types::{Quat, Vec3, WHITE};
use crate::math::{Aabb, Transform, euler, from_to_rotation, look_rotation};
use crate::segment::{Axis, ExtrusionSettings, Mesh, MeshColliderHandling, ObjectResult, ObjectSource, SegmentTemplate};
use crate::segment::LaneSource;
use crate::spline::{EvaluateMode, Sample, Spline, SplinePath};

/// A local point carried onto the path
#[derive(Clone, Copy, Debug)]
pub struct Mapped {
    pub sample: Sample,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Maps segment-local points through the bounds onto a world-space path
pub struct PathMapper<'a> {
    pub path: &'a SplinePath,
    pub bounds: Aabb,
    pub axis: Axis,
}

impl PathMapper<'_> {
    pub fn map(&self, local: Vec3) -> Mapped {
        let p = self.bounds.percent_of(local);
        let (min, max) = (self.bounds.min, self.bounds.max);
        let along = match self.axis {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        };
        let sample = self.path.evaluate(along as f64, EvaluateMode::Cached);
        let right = sample.right() * sample.size;
        let up = sample.up * sample.size;
        let (offset, axis_rotation) = match self.axis {
            Axis::Z => (right * lerp(min.x, max.x, p.x) + up * lerp(min.y, max.y, p.y), Quat::IDENTITY),
            Axis::X => (
                right * lerp(max.z, min.z, p.z) + up * lerp(min.y, max.y, p.y),
                euler(Vec3::new(0.0, -90.0, 0.0)),
            ),
            Axis::Y => (
                right * lerp(min.x, max.x, p.x) + up * lerp(min.z, max.z, p.z),
                euler(Vec3::new(90.0, 0.0, 0.0)),
            ),
        };
        Mapped {
            sample,
            position: sample.position + offset,
            rotation: sample.rotation() * axis_rotation,
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Rotation whose up follows `up_vector` instead of the path
fn upright(mapped: &Mapped, up_vector: Vec3) -> Quat {
    let path_up = mapped.sample.forward.cross(mapped.sample.right());
    from_to_rotation(path_up, up_vector) * mapped.rotation
}

/// Per-object input to an extrusion run
#[derive(Clone, Debug)]
pub struct ObjectInput {
    /// Index into the template's object list
    pub source: usize,
    pub settings: ExtrusionSettings,
    pub errored: bool,
}

/// Everything the numeric extrusion needs, owned so it can leave the thread
#[derive(Clone, Debug)]
pub struct ExtrusionJob {
    pub segment: u64,
    pub template: Arc<SegmentTemplate>,
    /// Segment root transform before extrusion
    pub root: Transform,
    pub bounds: Aabb,
    pub axis: Axis,
    /// Generated main spline, world space
    pub spline: Spline,
    /// Last sample of the previous segment, welded onto the start
    pub stitch: Option<Sample>,
    pub objects: Vec<ObjectInput>,
}

/// Owned results sent back to the pipeline
#[derive(Clone, Debug)]
pub struct ExtrusionOutput {
    pub segment: u64,
    pub path: SplinePath,
    /// One entry per object input; `None` for skipped objects
    pub objects: Vec<Option<ObjectResult>>,
    pub lanes: Vec<SplinePath>,
}

impl ExtrusionJob {
    pub fn run(self) -> ExtrusionOutput {
        let mut path = SplinePath::new(self.spline.clone());
        if let Some(previous_end) = self.stitch {
            path.stitch_start(previous_end);
        }
        let mapper = PathMapper { path: &path, bounds: self.bounds, axis: self.axis };

        let objects = self
            .objects
            .par_iter()
            .map(|input| {
                let source = self.template.objects.get(input.source)?;
                if input.errored || input.settings.ignore() {
                    return None;
                }
                extrude_object(&mapper, &self.root, source, &input.settings)
            })
            .collect();

        let lanes = self.template.lanes.iter().map(|lane| extrude_lane(&mapper, lane)).collect();

        ExtrusionOutput {
            segment: self.segment,
            path,
            objects,
            lanes,
        }
    }
}

/// Place one object on the path and bend its geometry
pub fn extrude_object(
    mapper: &PathMapper,
    root: &Transform,
    source: &ObjectSource,
    settings: &ExtrusionSettings,
) -> Option<ObjectResult> {
    let local = source.transform?;
    let mapped = mapper.map(local.position);
    let original_rotation = root.rotation * local.rotation;

    let mut rotation = original_rotation;
    if settings.apply_rotation {
        rotation = if settings.keep_upright {
            upright(&mapped, settings.up_vector)
        } else {
            mapped.rotation
        };
        if !source.is_root {
            rotation *= local.rotation;
        }
    }
    let target = Transform::new(mapped.position, rotation, local.scale);

    let mut result = ObjectResult {
        transform: target,
        ..Default::default()
    };
    if settings.apply_scale {
        result.transform.scale = local.scale * mapped.sample.size;
    }

    if settings.bend_mesh {
        if let Some(mesh) = &source.mesh {
            result.mesh = Some(bend_mesh(mapper, &local, &target, source.is_root, mesh, settings.apply_mesh_colors));
        }
    }
    if settings.bend_sprite {
        result.sprite_vertices = source
            .sprite_vertices
            .par_iter()
            .map(|v| target.inverse_transform_point(mapper.map(local.transform_point(*v)).position))
            .collect();
    }
    if settings.mesh_collider_handling == MeshColliderHandling::Extrude {
        if let Some(mesh) = &source.collision_mesh {
            result.collision_mesh = Some(bend_collider(mapper, &local, &target, original_rotation, mesh));
        }
    }
    Some(result)
}

fn bend_mesh(
    mapper: &PathMapper,
    local: &Transform,
    target: &Transform,
    is_root: bool,
    mesh: &Mesh,
    apply_colors: bool,
) -> Mesh {
    let (vertices, normals): (Vec<Vec3>, Vec<Vec3>) = mesh
        .vertices
        .par_iter()
        .enumerate()
        .map(|(i, v)| {
            let mapped = mapper.map(local.transform_point(*v));
            let normal = mesh.normals.get(i).copied().unwrap_or(Vec3::Y);
            let mut world_normal = mapped.rotation * normal;
            if !is_root {
                world_normal = local.rotation * world_normal;
            }
            (
                target.inverse_transform_point(mapped.position),
                target.inverse_transform_direction(world_normal).normalize_or_zero(),
            )
        })
        .unzip();

    let mut colors = mesh.colors.clone();
    if apply_colors {
        if colors.len() < vertices.len() {
            colors = vec![WHITE; vertices.len()];
        }
        for (color, v) in colors.iter_mut().zip(&mesh.vertices) {
            *color *= mapper.map(local.transform_point(*v)).sample.color;
        }
    }

    Mesh {
        vertices,
        normals,
        colors,
        triangles: mesh.triangles.clone(),
    }
}

fn bend_collider(mapper: &PathMapper, local: &Transform, target: &Transform, world_rotation: Quat, mesh: &Mesh) -> Mesh {
    let (vertices, normals): (Vec<Vec3>, Vec<Vec3>) = mesh
        .vertices
        .par_iter()
        .enumerate()
        .map(|(i, v)| {
            let mapped = mapper.map(local.transform_point(*v));
            let normal = mesh.normals.get(i).copied().unwrap_or(Vec3::Y);
            let world_normal = mapped.rotation * (world_rotation * normal);
            (
                target.inverse_transform_point(mapped.position),
                target.inverse_transform_direction(world_normal).normalize_or_zero(),
            )
        })
        .unzip();
    Mesh {
        vertices,
        normals,
        colors: mesh.colors.clone(),
        triangles: mesh.triangles.clone(),
    }
}

/// Carry a lane's control points onto the path
///
/// Interior handles are re-aligned with the average of both handle
/// directions. Seamless ends keep the authored handle offsets.
pub fn extrude_lane(mapper: &PathMapper, lane: &LaneSource) -> SplinePath {
    let n = lane.points.len();
    let mut spline = lane.spline();
    for (j, authored) in lane.points.iter().enumerate() {
        let mapped = mapper.map(authored.position);
        let delta1 = authored.tangent - authored.position;
        let delta2 = authored.tangent2 - authored.position;

        let point = &mut spline.points[j];
        point.position = mapped.position;
        point.normal = (mapped.rotation * authored.normal).normalize_or_zero();
        point.tangent = mapper.map(authored.tangent).position;
        point.tangent2 = mapper.map(authored.tangent2).position;

        if j > 0 && j + 1 < n {
            let back = look_rotation(point.position - point.tangent, point.normal);
            let ahead = look_rotation(point.tangent2 - point.position, point.normal);
            let average = back.slerp(ahead, 0.5);
            point.tangent = point.position + average * delta1;
            point.tangent2 = point.position + average * delta2;
        }
        if lane.seamless_ends {
            if j == 0 {
                point.set_tangent2_mirrored(point.position + mapped.rotation * delta2);
            } else if j + 1 == n {
                point.set_tangent_mirrored(point.position + mapped.rotation * delta1);
            }
        }
    }
    SplinePath::new(spline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::{ControlPoint, SplineKind};

    fn straight_path(length: f32) -> SplinePath {
        let points = vec![ControlPoint::new(Vec3::ZERO), ControlPoint::new(Vec3::new(0.0, 0.0, length))];
        SplinePath::new(Spline::new(points, SplineKind::Linear, 10))
    }

    fn turned_path() -> SplinePath {
        // Runs along +X
        let points = vec![ControlPoint::new(Vec3::ZERO), ControlPoint::new(Vec3::new(10.0, 0.0, 0.0))];
        SplinePath::new(Spline::new(points, SplineKind::Linear, 10))
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_straight_mapping_is_identity() {
        let path = straight_path(10.0);
        let mapper = PathMapper {
            path: &path,
            bounds: Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 10.0)),
            axis: Axis::Z,
        };
        let mapped = mapper.map(Vec3::new(0.5, 1.0, 5.0));
        assert!(approx(mapped.position, Vec3::new(0.5, 1.0, 5.0)));
    }

    #[test]
    fn test_mapping_follows_turned_path() {
        let path = turned_path();
        let mapper = PathMapper {
            path: &path,
            bounds: Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 10.0)),
            axis: Axis::Z,
        };
        // Local +X offset becomes path right, which is -Z when heading +X
        let mapped = mapper.map(Vec3::new(1.0, 0.0, 5.0));
        assert!(approx(mapped.position, Vec3::new(5.0, 0.0, -1.0)));
        assert!(approx(mapped.rotation * Vec3::Z, Vec3::X));
    }

    #[test]
    fn test_x_axis_rotation() {
        let path = straight_path(10.0);
        let mapper = PathMapper {
            path: &path,
            bounds: Aabb::new(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)),
            axis: Axis::X,
        };
        let mapped = mapper.map(Vec3::new(5.0, 0.0, 1.0));
        assert!(approx(mapped.sample.position, Vec3::new(0.0, 0.0, 5.0)));
        assert!(approx(mapped.rotation * Vec3::Z, Vec3::X) || approx(mapped.rotation * Vec3::Z, -Vec3::X));
    }

    #[test]
    fn test_bent_mesh_stays_on_straight_path() {
        let path = straight_path(10.0);
        let mapper = PathMapper {
            path: &path,
            bounds: Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 10.0)),
            axis: Axis::Z,
        };
        let source = ObjectSource::new("road", Transform::IDENTITY).with_mesh(Mesh::strip(2.0, 10.0, 4));
        let mut settings = ExtrusionSettings::default();
        settings.bend_mesh = true;
        let result = extrude_object(&mapper, &Transform::IDENTITY, &source, &settings).unwrap();
        let mesh = result.mesh.unwrap();
        let original = Mesh::strip(2.0, 10.0, 4);
        for (bent, authored) in mesh.vertices.iter().zip(&original.vertices) {
            assert!(approx(*bent, *authored));
        }
        assert!(mesh.normals.iter().all(|n| approx(*n, Vec3::Y)));
    }

    #[test]
    fn test_missing_transform_yields_nothing() {
        let path = straight_path(10.0);
        let mapper = PathMapper { path: &path, bounds: Aabb::from_point(Vec3::ZERO), axis: Axis::Z };
        let mut source = ObjectSource::new("broken", Transform::IDENTITY);
        source.transform = None;
        assert!(extrude_object(&mapper, &Transform::IDENTITY, &source, &ExtrusionSettings::default()).is_none());
    }

    #[test]
    fn test_lane_follows_path() {
        let path = turned_path();
        let bounds = Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 10.0));
        let mapper = PathMapper { path: &path, bounds, axis: Axis::Z };
        let mut lane = LaneSource::spanning("center", &bounds, Axis::Z);
        for p in &mut lane.points {
            p.translate(Vec3::new(0.0, 0.0, 5.0));
        }
        let extruded = extrude_lane(&mapper, &lane);
        assert!(approx(extruded.evaluate_position(0.0), Vec3::ZERO));
        assert!(approx(extruded.evaluate_position(1.0), Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_job_is_idempotent() {
        let template = Arc::new(SegmentTemplate::straight("road", 2.0, 10.0));
        let points = vec![ControlPoint::new(Vec3::ZERO), ControlPoint::new(Vec3::new(3.0, 0.0, 10.0))];
        let job = ExtrusionJob {
            segment: 0,
            template: template.clone(),
            root: Transform::IDENTITY,
            bounds: template.compute_bounds(),
            axis: Axis::Z,
            spline: Spline::new(points, SplineKind::CatmullRom, 10),
            stitch: None,
            objects: (0..template.objects.len())
                .map(|i| ObjectInput { source: i, settings: ExtrusionSettings::default(), errored: false })
                .collect(),
        };
        let a = job.clone().run();
        let b = job.run();
        assert_eq!(a.path.samples(), b.path.samples());
        let ta: Vec<_> = a.objects.iter().map(|o| o.as_ref().map(|r| r.transform)).collect();
        let tb: Vec<_> = b.objects.iter().map(|o| o.as_ref().map(|r| r.transform)).collect();
        assert_eq!(ta, tb);
    }

    #[test]
    fn test_stitch_welds_first_sample() {
        let template = Arc::new(SegmentTemplate::straight("road", 2.0, 10.0));
        let previous_end = Sample { position: Vec3::new(0.0, 0.5, 0.0), percent: 1.0, ..Default::default() };
        let job = ExtrusionJob {
            segment: 1,
            template: template.clone(),
            root: Transform::IDENTITY,
            bounds: template.compute_bounds(),
            axis: Axis::Z,
            spline: straight_path(10.0).spline().clone(),
            stitch: Some(previous_end),
            objects: Vec::new(),
        };
        let output = job.run();
        let first = output.path.first_sample().unwrap();
        assert_eq!(first.position, previous_end.position);
        assert_eq!(first.percent, 0.0);
    }
}
