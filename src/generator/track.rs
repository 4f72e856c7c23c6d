//! Track generator: keeps a rolling window of segments ahead of the viewer
//!
//! All multi-step work advances in [`TrackGenerator::tick`]. Creation, level
//! loads and unloads run one at a time through an [`ActionQueue`]; startup,
//! activation and clearing are small state machines polled on every tick.

use std::sync::Arc;
use std::sync::mpsc;

use crate::core::Result;
use crate::core::error::Error;
use crate::core::types::{Percent, Vec3};
use crate::core::Randomizer;
use crate::extrusion::{ExtrusionPipeline, ExtrusionStep};
use crate::math::{Transform, angle_axis};
use crate::path::{PathGenerator, SegmentLink, TrackContext};
use crate::segment::{Axis, BuildQueue, Segment, SegmentTemplate};
use crate::sequence::{Level, LevelIteration, TemplateLibrary, resolve_start_level};
use crate::spline::{EvaluateMode, Sample, TravelDirection};
use crate::streaming::level_loader::{LevelLoader, LoadResult};
use crate::streaming::source::LevelSource;
use super::action::{ActionQueue, TrackAction};
use super::config::GeneratorConfig;
use super::events::{EventBus, SubscriberId, TrackEvent};

/// Where the active path generator override came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OverrideSource {
    Level(usize),
    Sequence(usize, usize),
}

/// Progress of the in-flight action
#[derive(Debug)]
enum Task {
    Create {
        custom: Option<Arc<SegmentTemplate>>,
        since: f64,
        segment: Option<u64>,
    },
    Load {
        level: usize,
        since: f64,
        requested: bool,
    },
    Unload {
        level: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Startup {
    /// Waiting for the initial segments to be created
    Creating { target: usize },
    /// Waiting for the first segment to become ready
    AwaitingFirst,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClearPhase {
    /// Waiting for the in-flight action to finish
    Draining,
    /// Waiting for remote levels to unload
    Unloading,
}

#[derive(Clone, Copy, Debug)]
struct Activation {
    segment: u64,
    started: Option<f64>,
}

/// Procedural track generator
pub struct TrackGenerator {
    config: GeneratorConfig,
    /// Transform of the track owner; path generators work in its space
    pub owner: Transform,
    levels: Vec<Level>,
    library: TemplateLibrary,
    path_generator: Option<PathGenerator>,
    override_generator: Option<PathGenerator>,
    override_source: Option<OverrideSource>,
    segments: Vec<Segment>,
    pipeline: ExtrusionPipeline,
    loader: Option<LevelLoader>,
    level_randomizer: Randomizer,
    generation_randomizer: Randomizer,
    events: EventBus,
    actions: ActionQueue,
    task: Option<Task>,
    pending_creations: usize,
    startup: Option<Startup>,
    clearing: Option<ClearPhase>,
    restart_after_clear: bool,
    activations: Vec<Activation>,
    level_index: usize,
    segment_index: u64,
    entered_segment: Option<u64>,
    entered_level: Option<usize>,
    ready: bool,
    progress: f32,
    clock: f64,
}

impl TrackGenerator {
    pub fn new(config: GeneratorConfig, levels: Vec<Level>, path_generator: Option<PathGenerator>) -> Self {
        let config = config.validated();
        Self {
            pipeline: ExtrusionPipeline::new(config.multithreaded),
            level_randomizer: Randomizer::new(config.level_randomizer),
            generation_randomizer: Randomizer::new(config.generation_randomizer),
            config,
            owner: Transform::IDENTITY,
            levels,
            library: TemplateLibrary::new(),
            path_generator,
            override_generator: None,
            override_source: None,
            segments: Vec::new(),
            loader: None,
            events: EventBus::new(),
            actions: ActionQueue::new(),
            task: None,
            pending_creations: 0,
            startup: None,
            clearing: None,
            restart_after_clear: false,
            activations: Vec::new(),
            level_index: 0,
            segment_index: 0,
            entered_segment: None,
            entered_level: None,
            ready: false,
            progress: 0.0,
            clock: 0.0,
        }
    }

    /// Templates used to resolve remote level descriptors
    pub fn with_library(mut self, library: TemplateLibrary) -> Self {
        self.library = library;
        self
    }

    /// Load remote levels from `source` on a loader runtime
    pub fn with_level_source(mut self, source: Arc<dyn LevelSource>) -> Result<Self> {
        self.loader = Some(LevelLoader::new(source, 1)?);
        Ok(self)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn set_multithreaded(&mut self, multithreaded: bool) {
        self.config.multithreaded = multithreaded;
        self.pipeline.set_multithreaded(multithreaded);
    }

    pub fn subscribe(&mut self) -> (SubscriberId, mpsc::Receiver<TrackEvent>) {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: u64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.index == index)
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn current_level(&self) -> Option<&Level> {
        self.levels.get(self.level_index)
    }

    /// Generator producing the next segment's path
    pub fn current_path_generator(&self) -> Option<&PathGenerator> {
        self.override_generator.as_ref().or(self.path_generator.as_ref())
    }

    fn current_path_generator_mut(&mut self) -> Option<&mut PathGenerator> {
        self.override_generator.as_mut().or(self.path_generator.as_mut())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Startup progress in `[0, 1]`
    pub fn generation_progress(&self) -> f32 {
        self.progress
    }

    /// Action queue non-empty or an operation in flight
    pub fn is_busy(&self) -> bool {
        self.actions.is_busy() || self.pending_creations > 0 || self.clearing.is_some() || !self.pipeline.is_idle()
    }

    pub fn entered_segment(&self) -> Option<u64> {
        self.entered_segment
    }

    /// Random value from the generation randomizer, for builders and gameplay
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        self.generation_randomizer.range(min, max)
    }

    pub fn random_range_i32(&mut self, min: i32, max: i32) -> i32 {
        self.generation_randomizer.range_i32(min, max)
    }

    fn context(&self) -> TrackContext {
        TrackContext {
            owner: self.owner,
            track_end: self.segments.last().and_then(Segment::end_sample),
        }
    }

    /// Start generating from the configured start level
    ///
    /// Nothing is committed when the path generator or an enabled level is
    /// missing.
    pub fn start_generation(&mut self) -> Result<()> {
        if self.path_generator.is_none() {
            log::error!("Track generator does not have a path generator assigned");
            return Err(Error::Config("no path generator assigned".to_string()));
        }
        let Some(start) = resolve_start_level(self.config.start_level, &self.levels) else {
            log::error!("Track generator has no enabled level to start from");
            return Err(Error::Config("no enabled level".to_string()));
        };
        if self.clearing.is_some() {
            log::error!("Cannot start generation while the track is being cleared");
            return Err(Error::Config("clear in progress".to_string()));
        }

        self.level_randomizer.initialize();
        self.generation_randomizer.initialize();
        self.pending_creations = 0;
        self.activations.clear();
        self.override_generator = None;
        self.override_source = None;
        self.entered_level = None;
        self.entered_segment = None;
        self.segment_index = 0;
        self.ready = false;
        self.progress = 0.0;

        let ctx = self.context();
        if let Some(generator) = self.path_generator.as_mut() {
            generator.initialize(&ctx);
        }
        self.load_level(start);

        let target = (1 + self.config.generate_ahead).min(self.config.max_segments);
        self.startup = Some(Startup::Creating { target });
        self.queue_segment_creation(target);
        log::info!("Track generation started at level {} with {} segments", start, target);
        Ok(())
    }

    /// Clear the track, then start again
    pub fn restart(&mut self) {
        self.restart_after_clear = true;
        self.clear();
    }

    /// Destroy every segment and unload remote levels over the next ticks
    pub fn clear(&mut self) {
        if self.clearing.is_some() {
            return;
        }
        self.actions.interrupt();
        self.pending_creations = 0;
        self.startup = None;
        self.activations.clear();
        self.clearing = Some(ClearPhase::Draining);
        log::debug!("Clearing track with {} segments", self.segments.len());
    }

    pub fn queue_segment_creation(&mut self, count: usize) {
        self.pending_creations += count;
    }

    /// Create one segment from `template`, bypassing sequence selection
    pub fn queue_custom_segment(&mut self, template: Arc<SegmentTemplate>) {
        self.actions.push(TrackAction::CreateCustom(template));
    }

    pub fn next_level(&mut self) {
        if self.config.level_iteration == LevelIteration::SingleFinite {
            return;
        }
        let next = self
            .config
            .level_iteration
            .next_index(self.level_index, &self.levels, &mut self.level_randomizer);
        self.load_level(next);
    }

    pub fn set_level(&mut self, index: usize) {
        if index >= self.levels.len() {
            log::warn!("Level {} does not exist", index);
            return;
        }
        self.load_level(index);
    }

    pub fn skip_sequence(&mut self) {
        if let Some(level) = self.levels.get_mut(self.level_index) {
            level.skip_sequence();
        }
    }

    pub fn go_to_sequence(&mut self, index: usize) {
        if let Some(level) = self.levels.get_mut(self.level_index) {
            level.go_to_sequence(index);
        }
    }

    fn load_level(&mut self, index: usize) {
        self.level_index = index;
        self.events.emit(TrackEvent::LevelWillLoad(index));
        let Some(level) = self.levels.get(index) else {
            return;
        };
        if level.is_remote() {
            self.actions.push(TrackAction::LoadLevel(index));
        } else {
            self.enter_loaded_level(index);
        }
    }

    fn enter_loaded_level(&mut self, index: usize) {
        let Some(level) = self.levels.get_mut(index) else {
            return;
        };
        level.initialize();
        if index != self.level_index {
            return;
        }
        if let Some(generator) = level.path_generator.clone() {
            self.override_path_generator(generator, OverrideSource::Level(index));
        }
    }

    /// Hand path generation over to `generator`
    fn override_path_generator(&mut self, mut generator: PathGenerator, source: OverrideSource) {
        let ctx = self.context();
        generator.initialize(&ctx);
        if let Some(current) = self.current_path_generator() {
            generator.continue_from(current, &ctx);
        }
        log::debug!("Path generation overridden by {:?} ({})", source, generator.strategy.name());
        self.override_generator = Some(generator);
        self.override_source = Some(source);
    }

    fn on_sequence_entered(&mut self, level: usize, sequence: usize) {
        self.events.emit(TrackEvent::SequenceEntered { level, sequence });
        let Some(lvl) = self.levels.get(level) else {
            return;
        };
        if let Some(generator) = lvl.sequence(sequence).and_then(|s| s.path_generator.clone()) {
            self.override_path_generator(generator, OverrideSource::Sequence(level, sequence));
            return;
        }
        match lvl.path_generator.clone() {
            Some(generator) => {
                if self.override_source != Some(OverrideSource::Level(level)) {
                    self.override_path_generator(generator, OverrideSource::Level(level));
                }
            }
            None => {
                if let Some(previous) = self.override_generator.take() {
                    let ctx = self.context();
                    if let Some(shared) = self.path_generator.as_mut() {
                        shared.continue_from(&previous, &ctx);
                    }
                    self.override_source = None;
                    log::debug!("Path generation returned to the shared generator");
                }
            }
        }
    }

    /// Advance every routine by one step
    pub fn tick(&mut self, dt: f32) {
        self.clock += dt.max(0.0) as f64;
        self.feed_creations();
        self.tick_actions();
        for segment in &mut self.segments {
            segment.tick_builders(&mut self.generation_randomizer);
        }
        self.tick_activations();
        self.tick_startup();
        self.tick_clear();
    }

    /// Turn pending creation requests into actions, one at a time
    fn feed_creations(&mut self) {
        if self.pending_creations == 0 || self.actions.is_busy() {
            return;
        }
        if let Some(level) = self.levels.get(self.level_index) {
            if level.is_ready() && level.is_done() {
                log::debug!("Level {} is done; dropping {} queued creations", level.name, self.pending_creations);
                self.pending_creations = 0;
                return;
            }
        }
        self.pending_creations -= 1;
        self.actions.push(TrackAction::CreateNext);
    }

    fn tick_actions(&mut self) {
        if self.task.is_none() {
            let Some(action) = self.actions.begin() else {
                return;
            };
            self.task = Some(self.start_task(action));
        }
        let Some(task) = self.task.take() else {
            return;
        };
        self.task = self.step_task(task);
        if self.task.is_none() {
            self.actions.finish();
        }
    }

    fn start_task(&self, action: TrackAction) -> Task {
        log::trace!("Starting {:?}", action);
        match action {
            TrackAction::CreateNext => Task::Create { custom: None, since: self.clock, segment: None },
            TrackAction::CreateCustom(template) => Task::Create { custom: Some(template), since: self.clock, segment: None },
            TrackAction::LoadLevel(level) => Task::Load { level, since: self.clock, requested: false },
            TrackAction::UnloadLevel(level) => Task::Unload { level },
        }
    }

    /// Run one step of `task`; returns it back while it is still running
    fn step_task(&mut self, task: Task) -> Option<Task> {
        match task {
            Task::Create { custom, since, segment: None } => {
                let Some(level) = self.levels.get(self.level_index) else {
                    log::error!("Current level {} does not exist", self.level_index);
                    return None;
                };
                if !level.is_ready() {
                    if self.clock - since <= self.config.load_timeout as f64 {
                        return Some(Task::Create { custom, since, segment: None });
                    }
                    if custom.is_none() {
                        log::warn!("Level {} was not loaded in time, skipping segment creation", level.name);
                        return None;
                    }
                    log::warn!("Level {} was not loaded in time", level.name);
                } else if custom.is_none() && level.is_done() {
                    return None;
                }
                match self.create_segment(custom.clone()) {
                    Ok(index) => Some(Task::Create { custom, since, segment: Some(index) }),
                    Err(e) => {
                        log::error!("Segment creation failed: {}", e);
                        None
                    }
                }
            }
            Task::Create { custom, since, segment: Some(index) } => {
                let Some(segment) = self.segments.iter_mut().find(|s| s.index == index) else {
                    self.pipeline.stop();
                    self.finish_creation(custom.is_none());
                    return None;
                };
                match self.pipeline.tick(segment, &mut self.generation_randomizer) {
                    ExtrusionStep::Working => return Some(Task::Create { custom, since, segment: Some(index) }),
                    ExtrusionStep::Finished(i) => self.events.emit(TrackEvent::SegmentExtruded(i)),
                    ExtrusionStep::Failed(i) => log::warn!("Segment {} stays unextruded", i),
                    ExtrusionStep::Idle => {}
                }
                self.finish_creation(custom.is_none());
                None
            }
            Task::Load { level, since, requested } => self.step_load(level, since, requested),
            Task::Unload { level } => {
                if let Some(lvl) = self.levels.get_mut(level) {
                    lvl.unload();
                    log::debug!("Unloaded level {}", lvl.name);
                }
                None
            }
        }
    }

    fn step_load(&mut self, level: usize, since: f64, requested: bool) -> Option<Task> {
        let Some(lvl) = self.levels.get(level) else {
            return None;
        };
        if lvl.is_loaded() {
            self.enter_loaded_level(level);
            return None;
        }
        let Some(name) = lvl.remote.clone() else {
            self.enter_loaded_level(level);
            return None;
        };
        let Some(loader) = self.loader.as_mut() else {
            log::error!("Level {} is remote but no level source is configured", lvl.name);
            return None;
        };
        if !requested {
            loader.request(level, &name);
            return Some(Task::Load { level, since, requested: true });
        }

        for result in loader.poll_results() {
            if result.level() != level {
                log::debug!("Dropping stale load result for level {}", result.level());
                continue;
            }
            match result {
                LoadResult::Loaded(_, descriptor) => match self.library.resolve_content(&descriptor) {
                    Ok(content) => {
                        self.levels[level].set_loaded(content);
                        log::info!("Loaded remote level {}", name);
                        self.events.emit(TrackEvent::LevelLoaded(level));
                    }
                    Err(e) => log::error!("Failed loading remote level {}: {}", name, e),
                },
                LoadResult::NotFound(_, missing) => log::error!("Remote level {} not found", missing),
                LoadResult::Error(_, e) => log::error!("Failed loading remote level {}: {}", name, e),
            }
            self.enter_loaded_level(level);
            return None;
        }

        if self.clock - since > self.config.load_timeout as f64 {
            if let Some(loader) = self.loader.as_mut() {
                loader.cancel(level);
            }
            log::warn!("Timed out loading remote level {}", name);
            return None;
        }
        Some(Task::Load { level, since, requested })
    }

    /// Instantiate, place and path the next segment, then start its extrusion
    fn create_segment(&mut self, custom: Option<Arc<SegmentTemplate>>) -> Result<u64> {
        if self.current_path_generator().is_none() {
            return Err(Error::Config("no path generator assigned".to_string()));
        }
        if self.segment_index == u64::MAX {
            self.segment_index = 2;
        }
        let index = self.segment_index;
        let level = self.level_index;

        let mut segment = match custom {
            Some(template) => Segment::instantiate(index, level, template),
            None => {
                let Some(pick) = self.levels.get_mut(level).and_then(Level::next_definition) else {
                    return Err(Error::Config(format!("level {} yielded no segment", level)));
                };
                if let Some(sequence) = pick.entered_sequence {
                    self.on_sequence_entered(level, sequence);
                }
                pick.selection.instantiate(index, level)?
            }
        };
        segment.setup_builders(&mut self.generation_randomizer);
        self.place_segment(&mut segment);

        let link = self.segments.last().map(SegmentLink::of);
        if let Some(last) = self.segments.last_mut() {
            last.next = Some(index);
            segment.previous = Some(last.index);
        }
        if self.config.loop_segments {
            if let Some(first) = self.segments.first_mut() {
                segment.next = Some(first.index);
                first.previous = Some(index);
            }
        }

        let ctx = self.context();
        if let Some(generator) = self.current_path_generator_mut() {
            generator.generate_path(&mut segment, link, &ctx);
        }
        if let Err(e) = self.pipeline.begin(&segment, link.and_then(|l| l.end)) {
            if let Some(last) = self.segments.last_mut() {
                last.next = None;
            }
            release(segment);
            return Err(e);
        }

        self.segment_index += 1;
        log::debug!("Created segment {} ({}) in level {}", index, segment.name(), level);
        self.segments.push(segment);
        self.events.emit(TrackEvent::SegmentCreated(index));
        Ok(index)
    }

    /// Put the segment root at the end of the track
    fn place_segment(&self, segment: &mut Segment) {
        let mut position = segment.transform.position;
        let mut rotation = segment.transform.rotation;
        if let Some(end) = self.segments.last().and_then(Segment::end_sample) {
            position = end.position;
            rotation = match segment.axis() {
                Axis::X => angle_axis(90.0, Vec3::Y) * end.rotation(),
                Axis::Y => angle_axis(90.0, Vec3::X) * end.rotation(),
                Axis::Z => end.rotation(),
            };
        } else if segment.is_custom() {
            position = self.owner.position;
        }

        if segment.is_custom() {
            segment.align_entrance(position, rotation);
        } else if segment.objects.first().is_some_and(|o| o.settings.apply_rotation) {
            segment.transform.rotation = rotation;
        }
    }

    fn finish_creation(&mut self, from_sequence: bool) {
        if !self.config.loop_segments {
            while self.segments.len() > self.config.max_segments {
                self.destroy_segment(0);
            }
        }
        if from_sequence {
            self.handle_level_change();
        }
    }

    fn handle_level_change(&mut self) {
        let Some(level) = self.levels.get(self.level_index) else {
            return;
        };
        if !level.is_done() {
            return;
        }
        if self.config.level_iteration.is_depleted(self.level_index, self.levels.len()) {
            log::info!("All levels depleted");
            self.events.emit(TrackEvent::LevelsDepleted);
            return;
        }
        self.next_level();
    }

    /// Remove the segment at `slot` of the window and repair its neighbours
    pub fn destroy_segment(&mut self, slot: usize) {
        if slot >= self.segments.len() {
            log::warn!("No segment at slot {}", slot);
            return;
        }
        let segment = self.segments.remove(slot);
        if self.pipeline.segment() == Some(segment.index) {
            self.pipeline.stop();
        }
        for other in &mut self.segments {
            if other.next == Some(segment.index) {
                other.next = segment.next.filter(|&next| next != other.index);
            }
            if other.previous == Some(segment.index) {
                other.previous = segment.previous.filter(|&previous| previous != other.index);
            }
        }
        self.activations.retain(|a| a.segment != segment.index);

        if slot >= self.segments.len() {
            let ctx = self.context();
            if let Some(last) = self.segments.last() {
                if let Some(generator) = self.override_generator.as_mut().or(self.path_generator.as_mut()) {
                    generator.continue_from_segment(last, &ctx);
                }
            }
        }

        let level = segment.level;
        log::trace!("Destroyed segment {}", segment.index);
        release(segment);

        let still_used = self.segments.iter().any(|s| s.level == level);
        if let Some(lvl) = self.levels.get(level) {
            if lvl.is_remote() && lvl.is_loaded() && !still_used && level != self.level_index {
                self.actions.push(TrackAction::UnloadLevel(level));
            }
        }
    }

    /// Tell the generator the viewer entered the segment with `index`
    pub fn enter_segment(&mut self, index: u64) {
        if !self.ready {
            return;
        }
        if self.entered_segment.is_some_and(|entered| index <= entered) {
            return;
        }
        let Some(slot) = self.segments.iter().position(|s| s.index == index) else {
            log::warn!("Entered unknown segment {}", index);
            return;
        };
        self.entered_segment = Some(index);
        self.events.emit(TrackEvent::SegmentEntered(index));

        let level = self.segments[slot].level;
        if self.entered_level != Some(level) {
            let previous = self.entered_level.replace(level);
            self.events.emit(TrackEvent::LevelEntered { previous, level, segment: index });
        }

        let ahead = self.segments.len() - (slot + 1);
        if ahead < self.config.generate_ahead {
            self.queue_segment_creation(self.config.generate_ahead - ahead);
        }
        let last = (slot + self.config.activate_ahead).min(self.segments.len() - 1);
        for i in slot..=last {
            if !self.segments[i].is_activated() {
                let segment = self.segments[i].index;
                self.activate(segment);
            }
        }
    }

    fn activate(&mut self, segment: u64) {
        if self.activations.iter().any(|a| a.segment == segment) {
            return;
        }
        self.activations.push(Activation { segment, started: None });
    }

    fn tick_activations(&mut self) {
        let mut activated = Vec::new();
        let mut dropped = Vec::new();
        for activation in &mut self.activations {
            let Some(segment) = self.segments.iter_mut().find(|s| s.index == activation.segment) else {
                dropped.push(activation.segment);
                continue;
            };
            let since = match activation.started {
                Some(since) => since,
                None => {
                    if !segment.is_custom() && !segment.is_extruded() {
                        continue;
                    }
                    segment.start_builders(BuildQueue::OnActivate, &mut self.generation_randomizer);
                    activation.started = Some(self.clock);
                    self.clock
                }
            };
            if !segment.builders_done() {
                if self.clock - since <= self.config.builder_timeout as f64 {
                    continue;
                }
                log::warn!("Builders of segment {} are taking too long", segment.index);
            }
            segment.mark_activated();
            activated.push(segment.index);
        }
        if activated.is_empty() && dropped.is_empty() {
            return;
        }
        self.activations
            .retain(|a| !activated.contains(&a.segment) && !dropped.contains(&a.segment));
        for index in activated {
            log::trace!("Activated segment {}", index);
            self.events.emit(TrackEvent::SegmentActivated(index));
        }
    }

    fn tick_startup(&mut self) {
        match self.startup {
            None => {}
            Some(Startup::Creating { target }) => {
                let done = self.segments.iter().filter(|s| s.is_custom() || s.is_extruded()).count();
                let progress = (done as f32 / target.max(1) as f32).min(1.0);
                if progress != self.progress {
                    self.progress = progress;
                    self.events.emit(TrackEvent::Progress(progress));
                }
                if self.is_busy() {
                    return;
                }
                let count = self.config.activate_ahead.min(self.segments.len());
                for i in 0..count {
                    let segment = self.segments[i].index;
                    self.activate(segment);
                }
                self.startup = Some(Startup::AwaitingFirst);
            }
            Some(Startup::AwaitingFirst) => {
                let Some(first) = self.segments.first() else {
                    log::error!("Startup finished without creating a segment");
                    self.startup = None;
                    return;
                };
                if !first.is_ready() {
                    return;
                }
                let index = first.index;
                self.startup = None;
                self.ready = true;
                if self.progress != 1.0 {
                    self.progress = 1.0;
                    self.events.emit(TrackEvent::Progress(1.0));
                }
                log::info!("Track ready with {} segments", self.segments.len());
                self.events.emit(TrackEvent::Ready);
                self.enter_segment(index);
            }
        }
    }

    fn tick_clear(&mut self) {
        match self.clearing {
            None => {}
            Some(ClearPhase::Draining) => {
                if self.actions.is_in_flight() {
                    return;
                }
                self.actions.interrupt();
                self.pending_creations = 0;
                self.pipeline.stop();
                self.override_generator = None;
                self.override_source = None;
                self.activations.clear();
                for segment in self.segments.drain(..) {
                    release(segment);
                }
                for (i, level) in self.levels.iter().enumerate() {
                    if level.is_remote() && level.is_loaded() {
                        self.actions.push(TrackAction::UnloadLevel(i));
                    }
                }
                self.clearing = Some(ClearPhase::Unloading);
            }
            Some(ClearPhase::Unloading) => {
                if self.actions.is_busy() {
                    return;
                }
                self.entered_level = None;
                self.entered_segment = None;
                self.ready = false;
                self.progress = 0.0;
                self.clearing = None;
                log::debug!("Track cleared");
                if std::mem::take(&mut self.restart_after_clear) {
                    if let Err(e) = self.start_generation() {
                        log::error!("Restart failed: {}", e);
                    }
                }
            }
        }
    }

    /// Move the world by `-delta` so a viewer at `delta` ends up at the origin
    ///
    /// Refused while the generator is busy.
    pub fn shift_origin(&mut self, delta: Vec3) -> bool {
        if self.is_busy() {
            log::debug!("Origin shift postponed while generating");
            return false;
        }
        for segment in &mut self.segments {
            segment.translate(-delta);
        }
        let ctx = self.context();
        if let Some(generator) = self.path_generator.as_mut() {
            generator.shift_origin(delta, &ctx);
        }
        if let Some(generator) = self.override_generator.as_mut() {
            generator.shift_origin(delta, &ctx);
        }
        log::debug!("Origin shifted by {:?}", delta);
        self.events.emit(TrackEvent::OriginShifted(delta));
        true
    }

    /// Apply the floating origin settings for a viewer at `position`
    pub fn update_viewer(&mut self, position: Vec3) -> bool {
        let Some(reset) = self.config.origin_reset else {
            return false;
        };
        let out_of_bounds = (reset.x && position.x.abs() > reset.distance)
            || (reset.y && position.y.abs() > reset.distance)
            || (reset.z && position.z.abs() > reset.distance);
        if !out_of_bounds {
            return false;
        }
        let delta = Vec3::new(
            if reset.x { position.x } else { 0.0 },
            if reset.y { position.y } else { 0.0 },
            if reset.z { position.z } else { 0.0 },
        );
        self.shift_origin(delta)
    }

    /// Segment slot and local percent for a track-wide percent
    pub fn global_to_local(&self, percent: Percent) -> (usize, Percent) {
        let count = self.segments.len();
        if count == 0 {
            return (0, 0.0);
        }
        let value = percent * count as f64;
        let slot = (value.floor().max(0.0) as usize).min(count - 1);
        (slot, (value - slot as f64).clamp(0.0, 1.0))
    }

    pub fn local_to_global(&self, local: Percent, slot: usize) -> Percent {
        let count = self.segments.len();
        if count == 0 {
            return 0.0;
        }
        let per_segment = 1.0 / count as f64;
        (slot as f64 * per_segment + local * per_segment).clamp(0.0, 1.0)
    }

    pub fn segment_at_percent(&self, percent: Percent) -> Option<&Segment> {
        let (slot, _) = self.global_to_local(percent);
        self.segments.get(slot)
    }

    pub fn find_segment_for_point(&self, point: Vec3) -> Option<&Segment> {
        let sample = self.project(point)?;
        self.segment_at_percent(sample.percent)
    }

    /// Closest sample on the track, with a track-wide percent
    pub fn project(&self, point: Vec3) -> Option<Sample> {
        let mut closest: Option<(usize, Sample, f32)> = None;
        for (slot, segment) in self.segments.iter().enumerate() {
            if !segment.is_custom() && !segment.is_extruded() {
                continue;
            }
            let sample = segment.project(point, 0.0, 1.0);
            let dist = sample.position.distance_squared(point);
            if closest.as_ref().is_none_or(|(_, _, best)| dist < *best) {
                closest = Some((slot, sample, dist));
            }
        }
        let (slot, mut sample, _) = closest?;
        sample.percent = self.local_to_global(sample.percent, slot);
        Some(sample)
    }

    pub fn evaluate(&self, percent: Percent) -> Option<Sample> {
        let (slot, local) = self.global_to_local(percent);
        let mut sample = self.segments.get(slot)?.evaluate(local, EvaluateMode::Cached);
        sample.percent = percent;
        Some(sample)
    }

    pub fn evaluate_position(&self, percent: Percent) -> Vec3 {
        let (slot, local) = self.global_to_local(percent);
        self.segments
            .get(slot)
            .map(|s| s.evaluate_position(local))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn calculate_length(&self, from: Percent, to: Percent) -> f32 {
        if self.segments.is_empty() {
            return 0.0;
        }
        let (from, to) = if to < from { (to, from) } else { (from, to) };
        let (from_slot, from_local) = self.global_to_local(from);
        let (to_slot, to_local) = self.global_to_local(to);
        (from_slot..=to_slot)
            .map(|i| {
                let f = if i == from_slot { from_local } else { 0.0 };
                let t = if i == to_slot { to_local } else { 1.0 };
                self.segments[i].calculate_length(f, t)
            })
            .sum()
    }

    /// Percent reached after moving `distance` along the track from `start`
    pub fn travel(&self, start: Percent, distance: f32, direction: TravelDirection) -> Percent {
        if self.segments.is_empty() {
            return 0.0;
        }
        match direction {
            TravelDirection::Forward if start >= 1.0 => return 1.0,
            TravelDirection::Backward if start <= 0.0 => return 0.0,
            _ => {}
        }
        if distance == 0.0 {
            return start.clamp(0.0, 1.0);
        }
        let iterations: usize = self.segments.iter().map(|s| s.main_path().sample_count()).sum();
        if iterations < 2 {
            return start.clamp(0.0, 1.0);
        }
        let step = (iterations - 1) as f64;
        let mut next = match direction {
            TravelDirection::Forward => (start * step).ceil() as usize,
            TravelDirection::Backward => (start * step).floor() as usize,
        };
        let last_index = iterations - 1;
        let mut last_position = self.evaluate_position(start);
        let mut last_percent = start;
        let mut percent: f64;
        let mut moved = 0.0f32;
        let mut last_distance: f32;
        loop {
            percent = next as f64 / step;
            let position = self.evaluate_position(percent);
            last_distance = position.distance(last_position);
            last_position = position;
            moved += last_distance;
            if moved >= distance {
                break;
            }
            last_percent = percent;
            match direction {
                TravelDirection::Forward if next < last_index => next += 1,
                TravelDirection::Backward if next > 0 => next -= 1,
                _ => break,
            }
        }
        if last_distance <= f32::EPSILON {
            return percent;
        }
        let t = (1.0 - (moved - distance) / last_distance).clamp(0.0, 1.0) as f64;
        last_percent + (percent - last_percent) * t
    }
}

/// Return pooled segment bodies to their pool
fn release(mut segment: Segment) {
    if let Some(pool) = segment.pool.take() {
        if !pool.give(segment) {
            log::trace!("Segment pool full");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use crate::core::RandomizerConfig;
    use crate::segment::SegmentType;
    use crate::sequence::{
        DefinitionDescriptor, LevelDescriptor, SegmentDefinition, SegmentSequence, SelectionPolicy,
        SequenceDescriptor,
    };
    use crate::segment::{BuildContext, BuildQueue, Builder, BuilderFactory};
    use crate::streaming::source::{DirectoryLevelSource, LevelSource, LoadFuture, level_path};

    const DT: f32 = 1.0 / 60.0;

    fn template(name: &str) -> Arc<SegmentTemplate> {
        Arc::new(SegmentTemplate::straight(name, 2.0, 10.0))
    }

    fn ordered_level(names: &[&str]) -> Level {
        let definitions = names.iter().map(|n| SegmentDefinition::new(template(n))).collect();
        let sequence = SegmentSequence::new("main", SelectionPolicy::Ordered).with_definitions(definitions);
        Level::new("level", vec![sequence])
    }

    fn endless_level() -> Level {
        let definitions = vec![
            SegmentDefinition::new(template("a")),
            SegmentDefinition::new(template("b")).with_pool(4),
        ];
        let sequence = SegmentSequence::new("endless", SelectionPolicy::Random { prevent_repeat: true })
            .with_definitions(definitions)
            .with_randomizer(Randomizer::seeded(3))
            .with_spawn_count(0);
        Level::new("endless", vec![sequence])
    }

    fn config(generate_ahead: usize, max_segments: usize) -> GeneratorConfig {
        GeneratorConfig {
            generate_ahead,
            max_segments,
            multithreaded: false,
            level_randomizer: RandomizerConfig::Seeded(1),
            generation_randomizer: RandomizerConfig::Seeded(2),
            ..Default::default()
        }
    }

    fn generator(config: GeneratorConfig, levels: Vec<Level>) -> TrackGenerator {
        TrackGenerator::new(config, levels, Some(PathGenerator::default()))
    }

    fn tick_until(generator: &mut TrackGenerator, done: impl Fn(&TrackGenerator) -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(10) {
            if done(generator) {
                return true;
            }
            generator.tick(DT);
            std::thread::sleep(Duration::from_micros(200));
        }
        false
    }

    fn settle(generator: &mut TrackGenerator) {
        assert!(tick_until(generator, |g| g.is_ready() && !g.is_busy()));
    }

    fn drain(rx: &mpsc::Receiver<TrackEvent>) -> Vec<TrackEvent> {
        rx.try_iter().collect()
    }

    fn assert_linked(generator: &TrackGenerator) {
        for pair in generator.segments().windows(2) {
            assert_eq!(pair[0].next, Some(pair[1].index));
            assert_eq!(pair[1].previous, Some(pair[0].index));
            assert!(pair[0].index < pair[1].index);
        }
    }

    #[test]
    fn test_finite_level_depletes() {
        let mut generator = generator(config(3, 5), vec![ordered_level(&["a", "b"])]);
        let (_, rx) = generator.subscribe();
        generator.start_generation().unwrap();
        settle(&mut generator);
        for _ in 0..100 {
            generator.tick(DT);
        }

        assert_eq!(generator.segments().len(), 2);
        let events = drain(&rx);
        let depleted = events.iter().filter(|e| **e == TrackEvent::LevelsDepleted).count();
        assert_eq!(depleted, 1);
        assert!(events.contains(&TrackEvent::SegmentCreated(0)));
        assert!(events.contains(&TrackEvent::SegmentCreated(1)));
        assert!(!events.contains(&TrackEvent::SegmentCreated(2)));
        assert!(events.contains(&TrackEvent::Ready));
        assert!(events.contains(&TrackEvent::LevelEntered { previous: None, level: 0, segment: 0 }));
        assert_eq!(generator.generation_progress(), 1.0);
        assert_linked(&generator);
    }

    #[test]
    fn test_start_errors() {
        let mut empty = generator(config(3, 5), Vec::new());
        assert!(matches!(empty.start_generation(), Err(Error::Config(_))));

        let mut disabled = ordered_level(&["a"]);
        disabled.enabled = false;
        let mut all_disabled = generator(config(3, 5), vec![disabled]);
        assert!(matches!(all_disabled.start_generation(), Err(Error::Config(_))));

        let mut no_path = TrackGenerator::new(config(3, 5), vec![ordered_level(&["a"])], None);
        assert!(matches!(no_path.start_generation(), Err(Error::Config(_))));
        assert!(!no_path.is_busy());
    }

    #[test]
    fn test_window_stays_bounded() {
        let mut generator = generator(config(2, 4), vec![endless_level()]);
        generator.start_generation().unwrap();
        settle(&mut generator);
        assert_eq!(generator.segments().len(), 3);
        assert!(generator.segments()[0].is_ready());

        for _ in 0..8 {
            let entered = generator.entered_segment().unwrap();
            generator.enter_segment(entered + 1);
            settle(&mut generator);
            assert!(generator.segments().len() <= 4);
            assert_linked(&generator);
        }
        assert_eq!(generator.entered_segment(), Some(8));
        let last = generator.segments().last().unwrap().index;
        assert_eq!(last, 10);
    }

    #[test]
    fn test_entered_segments_are_activated_ahead() {
        let mut generator = generator(config(3, 6), vec![endless_level()]);
        generator.start_generation().unwrap();
        settle(&mut generator);
        generator.enter_segment(1);
        settle(&mut generator);
        assert!(tick_until(&mut generator, |g| g.segment(2).is_some_and(Segment::is_activated)));
        assert!(!generator.segment(3).unwrap().is_activated());

        generator.enter_segment(1);
        generator.enter_segment(0);
        assert_eq!(generator.entered_segment(), Some(1));
    }

    #[test]
    fn test_percent_round_trip() {
        let mut generator = generator(config(3, 5), vec![ordered_level(&["a", "b", "c", "d"])]);
        generator.start_generation().unwrap();
        settle(&mut generator);
        assert_eq!(generator.segments().len(), 4);

        assert_eq!(generator.global_to_local(0.625), (2, 0.5));
        assert_eq!(generator.global_to_local(1.0), (3, 1.0));
        for p in [0.0, 0.125, 0.25, 0.375, 0.5, 0.875, 1.0] {
            let (slot, local) = generator.global_to_local(p);
            assert_eq!(generator.local_to_global(local, slot), p);
        }
    }

    #[test]
    fn test_track_queries() {
        let mut generator = generator(config(3, 5), vec![ordered_level(&["a", "b", "c", "d"])]);
        generator.start_generation().unwrap();
        settle(&mut generator);

        let sample = generator.project(Vec3::new(0.5, 0.0, 15.0)).unwrap();
        assert!((sample.percent - 0.375).abs() < 1e-2);
        assert!((sample.position - Vec3::new(0.0, 0.0, 15.0)).length() < 0.1);
        assert_eq!(generator.find_segment_for_point(Vec3::new(0.0, 0.0, 15.0)).map(|s| s.index), Some(1));

        assert!((generator.evaluate_position(0.375) - Vec3::new(0.0, 0.0, 15.0)).length() < 0.1);
        assert_eq!(generator.evaluate(0.375).map(|s| s.percent), Some(0.375));
        assert!((generator.calculate_length(0.0, 1.0) - 40.0).abs() < 0.5);
        assert!((generator.calculate_length(1.0, 0.5) - 20.0).abs() < 0.5);

        let end = generator.travel(0.0, 15.0, TravelDirection::Forward);
        assert!((end - 0.375).abs() < 0.02);
        let back = generator.travel(end, 15.0, TravelDirection::Backward);
        assert!(back.abs() < 0.02);
        assert_eq!(generator.travel(1.0, 5.0, TravelDirection::Forward), 1.0);
    }

    #[test]
    fn test_custom_segment_continues_track() {
        let mut generator = generator(config(2, 8), vec![endless_level()]);
        generator.start_generation().unwrap();
        settle(&mut generator);

        let mut room = SegmentTemplate::new("room");
        room.kind = SegmentType::Custom {
            entrance: Transform::IDENTITY,
            exit: Transform::from_position_rotation(Vec3::new(0.0, 0.0, 6.0), Default::default()),
            keep_upright: false,
        };
        let track_end = generator.segments().last().and_then(Segment::end_sample).unwrap();
        generator.queue_custom_segment(Arc::new(room));
        settle(&mut generator);

        let custom = generator.segments().last().unwrap();
        assert!(custom.is_custom());
        let entrance = custom.custom_entrance().unwrap();
        let exit = custom.custom_exit().unwrap();
        assert!((entrance.position - track_end.position).length() < 1e-3);

        generator.queue_segment_creation(1);
        settle(&mut generator);
        let next = generator.segments().last().unwrap();
        let first = next.path.spline().points[0];
        assert!((first.position - exit.position).length() < 1e-3);
        assert_linked(&generator);
    }

    #[test]
    fn test_destroy_last_segment_reanchors_generator() {
        let mut generator = generator(config(3, 6), vec![endless_level()]);
        generator.start_generation().unwrap();
        settle(&mut generator);
        let count = generator.segments().len();

        generator.destroy_segment(count - 1);
        assert_eq!(generator.segments().len(), count - 1);
        let last = generator.segments().last().unwrap();
        assert_eq!(last.next, None);
        let end = last.path.spline().points.last().unwrap().position;
        let carried = generator.current_path_generator().unwrap().last_point().position;
        assert!((carried - end).length() < 1e-4);

        generator.destroy_segment(0);
        assert_eq!(generator.segments()[0].previous, None);
        assert_linked(&generator);
    }

    #[test]
    fn test_origin_shift() {
        let config = GeneratorConfig {
            origin_reset: Some(crate::generator::OriginResetConfig { distance: 5.0, ..Default::default() }),
            ..config(2, 4)
        };
        let mut generator = generator(config, vec![ordered_level(&["a", "b", "c"])]);
        let (_, rx) = generator.subscribe();
        generator.start_generation().unwrap();
        settle(&mut generator);

        let before = generator.segments()[1].path.first_sample().unwrap().position;
        assert!(!generator.update_viewer(Vec3::new(0.0, 0.0, 4.0)));
        assert!(generator.update_viewer(Vec3::new(1.0, 0.0, 8.0)));
        let after = generator.segments()[1].path.first_sample().unwrap().position;
        assert!((before - after - Vec3::new(1.0, 0.0, 8.0)).length() < 1e-4);
        assert!(drain(&rx).contains(&TrackEvent::OriginShifted(Vec3::new(1.0, 0.0, 8.0))));

        let end = generator.segments().last().unwrap().path.spline().points.last().unwrap().position;
        let carried = generator.current_path_generator().unwrap().last_point().position;
        assert!((carried - end).length() < 1e-4);
    }

    #[test]
    fn test_shift_refused_while_busy() {
        let mut generator = generator(config(2, 4), vec![endless_level()]);
        generator.start_generation().unwrap();
        assert!(generator.is_busy());
        assert!(!generator.shift_origin(Vec3::X));
    }

    #[test]
    fn test_clear_and_restart() {
        let mut generator = generator(config(2, 4), vec![endless_level()]);
        generator.start_generation().unwrap();
        settle(&mut generator);

        generator.clear();
        assert!(generator.is_busy());
        assert!(tick_until(&mut generator, |g| !g.is_busy()));
        assert!(generator.segments().is_empty());
        assert!(!generator.is_ready());
        assert_eq!(generator.entered_segment(), None);

        generator.restart();
        settle(&mut generator);
        assert_eq!(generator.segments()[0].index, 0);
        assert_eq!(generator.entered_segment(), Some(0));
    }

    #[test]
    fn test_levels_advance_in_order() {
        let mut config = config(2, 6);
        config.level_iteration = LevelIteration::OrderedLoop;
        let mut generator = generator(config, vec![ordered_level(&["a"]), ordered_level(&["b"])]);
        generator.start_generation().unwrap();
        settle(&mut generator);

        let names: Vec<&str> = generator.segments().iter().map(Segment::name).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        let levels: Vec<usize> = generator.segments().iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![0, 1, 0]);
    }

    #[test]
    fn test_sequence_path_generator_override() {
        let mut wavy = PathGenerator::new(crate::path::PathStrategy::Wavy(Default::default()));
        wavy.control_points_per_segment = 3;
        let first = SegmentSequence::new("plain", SelectionPolicy::Ordered)
            .with_definitions(vec![SegmentDefinition::new(template("a"))]);
        let mut second = SegmentSequence::new("waves", SelectionPolicy::Ordered)
            .with_definitions(vec![SegmentDefinition::new(template("b"))]);
        second.path_generator = Some(wavy);
        let third = SegmentSequence::new("back", SelectionPolicy::Ordered)
            .with_definitions(vec![SegmentDefinition::new(template("c"))]);
        let level = Level::new("level", vec![first, second, third]);

        let mut generator = generator(config(2, 6), vec![level]);
        let (_, rx) = generator.subscribe();
        generator.start_generation().unwrap();
        settle(&mut generator);

        let counts: Vec<usize> = generator.segments().iter().map(|s| s.path.spline().points.len()).collect();
        assert_eq!(counts, vec![5, 3, 5]);
        let entered = drain(&rx)
            .into_iter()
            .filter(|e| matches!(e, TrackEvent::SequenceEntered { .. }))
            .count();
        assert_eq!(entered, 3);
        assert_linked(&generator);
    }

    #[test]
    fn test_background_extrusion() {
        let mut config = config(2, 4);
        config.multithreaded = true;
        let mut generator = generator(config, vec![endless_level()]);
        generator.start_generation().unwrap();
        settle(&mut generator);
        assert!(generator.segments().iter().all(Segment::is_extruded));
    }

    #[test]
    fn test_remote_level_loads() {
        let dir = tempfile::TempDir::new().unwrap();
        let descriptor = LevelDescriptor {
            name: "far".to_string(),
            sequences: vec![SequenceDescriptor {
                name: "far".to_string(),
                definitions: vec![
                    DefinitionDescriptor { template: Some("road".to_string()), ..Default::default() },
                    DefinitionDescriptor { template: Some("road".to_string()), ..Default::default() },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        std::fs::write(level_path(dir.path(), "far"), serde_json::to_string(&descriptor).unwrap()).unwrap();

        let mut library = TemplateLibrary::new();
        library.insert(SegmentTemplate::straight("road", 2.0, 10.0));
        let mut generator = generator(config(3, 5), vec![Level::remote("far", "far")])
            .with_library(library)
            .with_level_source(Arc::new(DirectoryLevelSource::new(dir.path())))
            .unwrap();
        let (_, rx) = generator.subscribe();
        generator.start_generation().unwrap();
        settle(&mut generator);

        assert_eq!(generator.segments().len(), 2);
        let events = drain(&rx);
        assert!(events.contains(&TrackEvent::LevelWillLoad(0)));
        assert!(events.contains(&TrackEvent::LevelLoaded(0)));
        assert!(generator.levels()[0].is_loaded());
    }

    /// Source whose loads never complete
    struct StalledSource;

    impl LevelSource for StalledSource {
        fn load(&self, _name: &str) -> LoadFuture {
            Box::pin(std::future::pending())
        }
    }

    #[test]
    fn test_stalled_level_load_times_out() {
        let mut config = config(2, 4);
        config.load_timeout = 0.25;
        let mut generator = generator(config, vec![Level::remote("far", "far")])
            .with_level_source(Arc::new(StalledSource))
            .unwrap();
        generator.start_generation().unwrap();
        assert!(generator.is_busy());

        assert!(tick_until(&mut generator, |g| !g.is_busy()));
        assert!(generator.segments().is_empty());
        assert!(!generator.is_ready());
        assert!(!generator.levels()[0].is_loaded());
        // the load and each of the three creations waited out the timeout
        assert!(generator.clock > 4.0 * 0.25);

        generator.queue_custom_segment(template("detour"));
        assert!(tick_until(&mut generator, |g| !g.is_busy()));
        assert_eq!(generator.segments().len(), 1);
        assert_eq!(generator.segments()[0].name(), "detour");
    }

    /// Builder that never reports done
    struct StuckBuilder;

    impl Builder for StuckBuilder {
        fn queue(&self) -> BuildQueue {
            BuildQueue::OnActivate
        }

        fn start(&mut self, _ctx: &mut BuildContext<'_>) {}

        fn is_done(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_slow_builders_are_forced_after_timeout() {
        let mut stuck = SegmentTemplate::straight("stuck", 2.0, 10.0);
        stuck.builders.push(BuilderFactory::new(|| Box::new(StuckBuilder)));
        let stuck = Arc::new(stuck);
        let definitions = vec![SegmentDefinition::new(stuck.clone()), SegmentDefinition::new(stuck)];
        let sequence = SegmentSequence::new("main", SelectionPolicy::Ordered).with_definitions(definitions);

        let mut config = config(1, 3);
        config.builder_timeout = 0.5;
        let mut generator = generator(config, vec![Level::new("level", vec![sequence])]);
        let (_, rx) = generator.subscribe();
        generator.start_generation().unwrap();

        assert!(tick_until(&mut generator, |g| g.segments().first().is_some_and(Segment::is_extruded)));
        let extruded_at = generator.clock;
        settle(&mut generator);

        let first = &generator.segments()[0];
        assert!(first.is_activated());
        assert!(!first.builders_done());
        assert!(generator.clock - extruded_at >= 0.5);
        assert!(drain(&rx).contains(&TrackEvent::SegmentActivated(first.index)));
    }

    #[test]
    fn test_generation_randomizer_is_seeded_per_start() {
        let mut generator = generator(config(2, 4), vec![ordered_level(&["a"])]);
        generator.start_generation().unwrap();
        let first = generator.random_range(0.0, 100.0);
        generator.start_generation().unwrap();
        assert_eq!(generator.random_range(0.0, 100.0), first);
        let value = generator.random_range_i32(0, 10);
        assert!((0..10).contains(&value));
    }
}
