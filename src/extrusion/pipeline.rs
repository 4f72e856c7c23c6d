//! Tick-driven extrusion of one segment at a time

use std::sync::mpsc;

use crate::core::Result;
use crate::core::Randomizer;
use crate::core::error::Error;
use crate::segment::{BuildQueue, Lane, Segment};
use crate::spline::{Sample, SplinePath};
use super::batch::BatchCursor;
use super::mapping::{ExtrusionJob, ExtrusionOutput, ObjectInput};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtrusionState {
    #[default]
    Idle,
    /// Per-object runtime initialization, sliced over ticks
    Prepare,
    /// Numeric deformation, inline or on a worker
    Extrude,
    /// Results applied, sliced over ticks, then builders started
    Post,
}

/// Outcome of one pipeline tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtrusionStep {
    Idle,
    Working,
    Finished(u64),
    Failed(u64),
}

/// Drives `Idle -> Prepare -> Extrude -> Post -> Idle` for one segment
///
/// The segment itself stays with the caller, which hands it back on every
/// [`tick`](Self::tick). Background work only sees owned copies of the
/// segment's sources.
pub struct ExtrusionPipeline {
    multithreaded: bool,
    state: ExtrusionState,
    segment: Option<u64>,
    stitch: Option<Sample>,
    cursor: BatchCursor,
    receiver: Option<mpsc::Receiver<ExtrusionOutput>>,
    output: Option<ExtrusionOutput>,
}

impl ExtrusionPipeline {
    pub fn new(multithreaded: bool) -> Self {
        Self {
            multithreaded,
            state: ExtrusionState::Idle,
            segment: None,
            stitch: None,
            cursor: BatchCursor::default(),
            receiver: None,
            output: None,
        }
    }

    pub fn state(&self) -> ExtrusionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ExtrusionState::Idle
    }

    /// Index of the segment in flight
    pub fn segment(&self) -> Option<u64> {
        self.segment
    }

    pub fn set_multithreaded(&mut self, multithreaded: bool) {
        self.multithreaded = multithreaded;
    }

    /// Start extruding `segment`; `stitch` is the previous segment's end sample
    pub fn begin(&mut self, segment: &Segment, stitch: Option<Sample>) -> Result<()> {
        if self.state != ExtrusionState::Idle {
            log::error!(
                "Cannot extrude segment {} because segment {:?} is currently being computed",
                segment.index,
                self.segment
            );
            return Err(Error::ExtrusionBusy(segment.index));
        }
        self.segment = Some(segment.index);
        self.stitch = if segment.stitch { stitch } else { None };
        self.cursor = BatchCursor::new(segment.objects.len());
        self.output = None;
        self.state = ExtrusionState::Prepare;
        log::trace!("Extrusion of segment {} prepared", segment.index);
        Ok(())
    }

    /// Abandon the segment in flight; a late worker result is dropped
    pub fn stop(&mut self) {
        if let Some(index) = self.segment.take() {
            log::debug!("Extrusion of segment {} stopped", index);
        }
        self.receiver = None;
        self.output = None;
        self.state = ExtrusionState::Idle;
    }

    /// Advance the state machine for the segment returned by [`segment`](Self::segment)
    pub fn tick(&mut self, segment: &mut Segment, randomizer: &mut Randomizer) -> ExtrusionStep {
        if self.segment != Some(segment.index) {
            return if self.is_idle() { ExtrusionStep::Idle } else { ExtrusionStep::Working };
        }
        match self.state {
            ExtrusionState::Idle => ExtrusionStep::Idle,
            ExtrusionState::Prepare => {
                self.prepare(segment);
                ExtrusionStep::Working
            }
            ExtrusionState::Extrude => self.poll_worker(segment.index),
            ExtrusionState::Post => self.post(segment, randomizer),
        }
    }

    fn prepare(&mut self, segment: &mut Segment) {
        let template = segment.template.clone();
        if let Some(range) = self.cursor.next_range() {
            for object in &mut segment.objects[range] {
                if let Some(source) = template.objects.get(object.source) {
                    object.runtime_initialize(source);
                }
            }
        }
        if !self.cursor.is_done() {
            return;
        }

        if segment.is_custom() {
            place_custom(segment);
            self.cursor = BatchCursor::new(0);
            self.state = ExtrusionState::Post;
            return;
        }

        let job = ExtrusionJob {
            segment: segment.index,
            template,
            root: segment.transform,
            bounds: segment.bounds,
            axis: segment.axis(),
            spline: segment.path.spline().clone(),
            stitch: self.stitch,
            objects: segment
                .objects
                .iter()
                .map(|o| ObjectInput { source: o.source, settings: o.settings.clone(), errored: o.errored })
                .collect(),
        };

        if self.multithreaded {
            let (tx, rx) = mpsc::channel();
            rayon::spawn(move || {
                let _ = tx.send(job.run());
            });
            self.receiver = Some(rx);
            self.state = ExtrusionState::Extrude;
        } else {
            self.output = Some(job.run());
            self.cursor = BatchCursor::new(segment.objects.len());
            self.state = ExtrusionState::Post;
        }
    }

    fn poll_worker(&mut self, index: u64) -> ExtrusionStep {
        let Some(receiver) = &self.receiver else {
            log::error!("Extrusion of segment {} has no worker", index);
            self.stop();
            return ExtrusionStep::Failed(index);
        };
        match receiver.try_recv() {
            Ok(output) => {
                self.cursor = BatchCursor::new(output.objects.len());
                self.output = Some(output);
                self.receiver = None;
                self.state = ExtrusionState::Post;
                ExtrusionStep::Working
            }
            Err(mpsc::TryRecvError::Empty) => ExtrusionStep::Working,
            Err(mpsc::TryRecvError::Disconnected) => {
                log::error!("Extrusion worker for segment {} exited without a result", index);
                self.stop();
                ExtrusionStep::Failed(index)
            }
        }
    }

    fn post(&mut self, segment: &mut Segment, randomizer: &mut Randomizer) -> ExtrusionStep {
        if let Some(output) = &mut self.output {
            if let Some(range) = self.cursor.next_range() {
                for i in range {
                    if let (Some(object), Some(result)) = (segment.objects.get_mut(i), output.objects[i].take()) {
                        object.apply(result);
                    }
                }
            }
            if !self.cursor.is_done() {
                return ExtrusionStep::Working;
            }
        }

        if let Some(output) = self.output.take() {
            segment.path = output.path;
            for (lane, path) in segment.lanes.iter_mut().zip(output.lanes) {
                lane.path = path;
            }
            segment.mark_extruded();
        }
        segment.start_builders(BuildQueue::OnGenerate, randomizer);

        let index = segment.index;
        self.segment = None;
        self.state = ExtrusionState::Idle;
        log::debug!("Segment {} extruded", index);
        ExtrusionStep::Finished(index)
    }
}

/// Custom segments keep their shape: the path runs from entrance to exit and
/// lanes move rigidly with the root
fn place_custom(segment: &mut Segment) {
    let (Some(entrance), Some(exit)) = (segment.custom_entrance(), segment.custom_exit()) else {
        return;
    };
    let frame = |t: &crate::math::Transform, percent: f64| Sample {
        position: t.position,
        forward: t.forward(),
        up: t.up(),
        percent,
        ..Default::default()
    };
    segment.path = SplinePath::from_samples(vec![frame(&entrance, 0.0), frame(&exit, 1.0)]);
    let template = segment.template.clone();
    for (lane, source) in segment.lanes.iter_mut().zip(&template.lanes) {
        lane.path = Lane::placed(source, &segment.transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use crate::core::types::Vec3;
    use crate::math::Transform;
    use crate::segment::{Mesh, ObjectSource, SegmentTemplate, SegmentType};
    use crate::spline::{ControlPoint, Spline, SplineKind};

    fn segment(index: u64) -> Segment {
        let mut template = SegmentTemplate::straight("road", 2.0, 10.0);
        template.objects[0].settings.bend_mesh = true;
        template.objects[0] = template.objects[0].clone().with_mesh(Mesh::strip(2.0, 10.0, 2));
        let mut segment = Segment::instantiate(index, 0, Arc::new(template));
        let points = vec![ControlPoint::new(Vec3::ZERO), ControlPoint::new(Vec3::new(0.0, 0.0, 10.0))];
        segment.set_spline(Spline::new(points, SplineKind::Linear, 10));
        segment
    }

    fn run(pipeline: &mut ExtrusionPipeline, segment: &mut Segment) -> ExtrusionStep {
        let mut rng = Randomizer::seeded(1);
        let start = Instant::now();
        loop {
            match pipeline.tick(segment, &mut rng) {
                ExtrusionStep::Working if start.elapsed() < Duration::from_secs(5) => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                step => return step,
            }
        }
    }

    #[test]
    fn test_inline_extrusion_completes() {
        let mut pipeline = ExtrusionPipeline::new(false);
        let mut seg = segment(3);
        pipeline.begin(&seg, None).unwrap();
        assert_eq!(pipeline.state(), ExtrusionState::Prepare);
        assert_eq!(run(&mut pipeline, &mut seg), ExtrusionStep::Finished(3));
        assert!(seg.is_extruded());
        assert!(pipeline.is_idle());
        assert!(seg.objects[0].mesh.is_some());
    }

    #[test]
    fn test_background_extrusion_completes() {
        let mut pipeline = ExtrusionPipeline::new(true);
        let mut seg = segment(4);
        pipeline.begin(&seg, None).unwrap();
        assert_eq!(run(&mut pipeline, &mut seg), ExtrusionStep::Finished(4));
        assert!(seg.is_extruded());
    }

    #[test]
    fn test_busy_pipeline_refuses() {
        let mut pipeline = ExtrusionPipeline::new(false);
        let first = segment(1);
        let second = segment(2);
        pipeline.begin(&first, None).unwrap();
        assert!(matches!(pipeline.begin(&second, None), Err(Error::ExtrusionBusy(2))));
        assert_eq!(pipeline.segment(), Some(1));
    }

    #[test]
    fn test_stop_returns_to_idle() {
        let mut pipeline = ExtrusionPipeline::new(true);
        let seg = segment(1);
        pipeline.begin(&seg, None).unwrap();
        pipeline.stop();
        assert!(pipeline.is_idle());
        assert_eq!(pipeline.segment(), None);
    }

    #[test]
    fn test_stitch_is_applied() {
        let mut pipeline = ExtrusionPipeline::new(false);
        let mut seg = segment(1);
        let end = Sample { position: Vec3::new(0.0, 0.25, 0.0), ..Default::default() };
        pipeline.begin(&seg, Some(end)).unwrap();
        run(&mut pipeline, &mut seg);
        assert_eq!(seg.path.first_sample().map(|s| s.position), Some(end.position));
    }

    #[test]
    fn test_custom_segment_is_placed_not_extruded() {
        let mut template = SegmentTemplate::new("room");
        template.kind = SegmentType::Custom {
            entrance: Transform::IDENTITY,
            exit: Transform::from_position_rotation(Vec3::new(0.0, 0.0, 6.0), Default::default()),
            keep_upright: false,
        };
        template.objects.push(ObjectSource::new("floor", Transform::IDENTITY));
        let mut seg = Segment::instantiate(9, 0, Arc::new(template));
        seg.align_entrance(Vec3::new(1.0, 0.0, 0.0), Default::default());

        let mut pipeline = ExtrusionPipeline::new(true);
        pipeline.begin(&seg, None).unwrap();
        assert_eq!(run(&mut pipeline, &mut seg), ExtrusionStep::Finished(9));
        assert!(!seg.is_extruded());
        assert_eq!(seg.path.last_sample().map(|s| s.position), Some(Vec3::new(1.0, 0.0, 6.0)));
    }
}
