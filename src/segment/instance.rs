//! Instantiated, spatially anchored segment

use std::fmt;
use std::sync::Arc;

use crate::core::types::{Percent, Vec3};
use crate::core::Randomizer;
use crate::math::{Aabb, Transform, from_to_rotation};
use crate::spline::{EvaluateMode, Sample, Spline, SplinePath, TravelDirection};
use super::builder::{BuildContext, BuildQueue, BuilderSlot};
use super::lane::Lane;
use super::object::SegmentObject;
use super::pool::SegmentPool;
use super::template::{Axis, SegmentTemplate, SegmentType};

/// One piece of the track
///
/// Segments are identified by a monotonically increasing `index`. Links to
/// neighbours are stored as indices and resolved through the generator.
pub struct Segment {
    pub index: u64,
    /// Index of the level the segment was created for
    pub level: usize,
    pub template: Arc<SegmentTemplate>,
    /// Root transform; `bounds` are expressed in this space
    pub transform: Transform,
    pub bounds: Aabb,
    /// Main path in world space
    pub path: SplinePath,
    pub lanes: Vec<Lane>,
    pub objects: Vec<SegmentObject>,
    /// Weld the first path sample onto the previous segment's end
    pub stitch: bool,
    pub previous: Option<u64>,
    pub next: Option<u64>,
    pub(crate) pool: Option<Arc<SegmentPool>>,
    builders: Vec<BuilderSlot>,
    extruded: bool,
    activated: bool,
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("index", &self.index)
            .field("template", &self.template.name)
            .field("level", &self.level)
            .field("extruded", &self.extruded)
            .field("activated", &self.activated)
            .field("previous", &self.previous)
            .field("next", &self.next)
            .finish()
    }
}

impl Segment {
    /// Create a segment from a template
    pub fn instantiate(index: u64, level: usize, template: Arc<SegmentTemplate>) -> Self {
        let objects = template
            .collected_objects()
            .into_iter()
            .map(|i| SegmentObject::from_source(i, &template.objects[i]))
            .collect();
        let lanes = template.lanes.iter().map(Lane::from_source).collect();
        let mut builders: Vec<BuilderSlot> = template
            .builders
            .iter()
            .map(|factory| BuilderSlot { builder: factory.create(), started: false })
            .collect();
        builders.sort_by_key(|slot| slot.builder.priority());

        Self {
            index,
            level,
            bounds: template.compute_bounds(),
            template,
            transform: Transform::IDENTITY,
            path: SplinePath::default(),
            lanes,
            objects,
            stitch: true,
            previous: None,
            next: None,
            pool: None,
            builders,
            extruded: false,
            activated: false,
        }
    }

    /// Reset a pooled segment so it can be placed again
    ///
    /// Objects, lanes and builders are reset in place; their buffers are kept.
    /// Builders get `setup` again when the generator places the segment.
    pub fn recycle(&mut self, index: u64, level: usize) {
        self.index = index;
        self.level = level;
        self.transform = Transform::IDENTITY;
        self.bounds = self.template.compute_bounds();
        self.path = SplinePath::default();
        for lane in &mut self.lanes {
            lane.path = SplinePath::default();
        }
        for object in &mut self.objects {
            if let Some(source) = self.template.objects.get(object.source) {
                object.reset(source);
            }
        }
        for slot in &mut self.builders {
            slot.started = false;
        }
        self.stitch = true;
        self.previous = None;
        self.next = None;
        self.extruded = false;
        self.activated = false;
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn axis(&self) -> Axis {
        self.template.axis
    }

    pub fn is_custom(&self) -> bool {
        self.template.is_custom()
    }

    pub fn is_extruded(&self) -> bool {
        self.extruded
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Activated and either extruded or custom
    pub fn is_ready(&self) -> bool {
        self.activated && (self.extruded || self.is_custom())
    }

    pub(crate) fn mark_extruded(&mut self) {
        self.extruded = true;
    }

    pub(crate) fn mark_activated(&mut self) {
        self.activated = true;
    }

    /// Entrance frame in world space, for custom segments
    pub fn custom_entrance(&self) -> Option<Transform> {
        match &self.template.kind {
            SegmentType::Custom { entrance, .. } => Some(self.transform.compose(entrance)),
            SegmentType::Extruded => None,
        }
    }

    /// Exit frame in world space, for custom segments
    pub fn custom_exit(&self) -> Option<Transform> {
        match &self.template.kind {
            SegmentType::Custom { exit, .. } => Some(self.transform.compose(exit)),
            SegmentType::Extruded => None,
        }
    }

    /// Place a custom segment so its entrance sits on `position` facing `rotation`
    pub fn align_entrance(&mut self, position: Vec3, rotation: crate::core::types::Quat) {
        let SegmentType::Custom { entrance, keep_upright, .. } = &self.template.kind else {
            self.transform = Transform::from_position_rotation(position, rotation);
            return;
        };
        let mut root_rotation = rotation * entrance.rotation.inverse();
        if *keep_upright {
            let world_up = root_rotation * entrance.up();
            root_rotation = from_to_rotation(world_up, Vec3::Y) * root_rotation;
        }
        self.transform.rotation = root_rotation;
        self.transform.position = position - root_rotation * (entrance.position * self.transform.scale);
    }

    /// Commit a freshly generated spline as the main path
    pub fn set_spline(&mut self, spline: Spline) {
        self.path = SplinePath::new(spline);
    }

    /// Last sample of the segment in world space
    ///
    /// Custom segments report their exit frame. Extruded segments report the
    /// end of the main path, or `None` before a path exists.
    pub fn end_sample(&self) -> Option<Sample> {
        if let Some(exit) = self.custom_exit() {
            return Some(Sample {
                position: exit.position,
                forward: exit.forward(),
                up: exit.up(),
                percent: 1.0,
                ..Default::default()
            });
        }
        self.main_path().last_sample().copied()
    }

    /// Path used for track queries: the main lane when one is set
    pub fn main_path(&self) -> &SplinePath {
        match self.template.main_lane {
            Some(i) if i < self.lanes.len() && !self.lanes[i].path.is_empty() => &self.lanes[i].path,
            _ => &self.path,
        }
    }

    pub fn lane(&self, name: &str) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.name == name)
    }

    pub fn evaluate(&self, percent: Percent, mode: EvaluateMode) -> Sample {
        self.main_path().evaluate(percent, mode)
    }

    pub fn evaluate_position(&self, percent: Percent) -> Vec3 {
        self.main_path().evaluate_position(percent)
    }

    pub fn project(&self, point: Vec3, from: Percent, to: Percent) -> Sample {
        self.main_path().project(point, from, to)
    }

    pub fn travel(&self, start: Percent, distance: f32, direction: TravelDirection) -> (Percent, f32) {
        self.main_path().travel(start, distance, direction)
    }

    pub fn calculate_length(&self, from: Percent, to: Percent) -> f32 {
        self.main_path().calculate_length(from, to)
    }

    pub fn length(&self) -> f32 {
        self.main_path().length()
    }

    /// Move the segment and everything it produced
    pub fn translate(&mut self, offset: Vec3) {
        self.transform.position += offset;
        self.path.translate(offset);
        for lane in &mut self.lanes {
            lane.path.translate(offset);
        }
        for object in &mut self.objects {
            object.transform.position += offset;
        }
    }

    /// Run every builder's one-time setup
    pub(crate) fn setup_builders(&mut self, randomizer: &mut Randomizer) {
        let mut ctx = BuildContext {
            segment_index: self.index,
            objects: &mut self.objects,
            randomizer,
        };
        for slot in &mut self.builders {
            slot.builder.setup(&mut ctx);
        }
    }

    /// Start every not yet started builder of `queue`, in priority order
    pub(crate) fn start_builders(&mut self, queue: BuildQueue, randomizer: &mut Randomizer) {
        let mut ctx = BuildContext {
            segment_index: self.index,
            objects: &mut self.objects,
            randomizer,
        };
        for slot in &mut self.builders {
            if slot.started || slot.builder.queue() != queue {
                continue;
            }
            slot.builder.start(&mut ctx);
            slot.started = true;
        }
    }

    /// Advance running builders
    pub(crate) fn tick_builders(&mut self, randomizer: &mut Randomizer) {
        let mut ctx = BuildContext {
            segment_index: self.index,
            objects: &mut self.objects,
            randomizer,
        };
        for slot in &mut self.builders {
            if slot.started && !slot.builder.is_done() {
                slot.builder.tick(&mut ctx);
            }
        }
    }

    /// Whether every started builder has finished
    pub fn builders_done(&self) -> bool {
        self.builders
            .iter()
            .all(|slot| !slot.started || slot.builder.is_done())
    }

    pub fn builder_count(&self) -> usize {
        self.builders.len()
    }
}
