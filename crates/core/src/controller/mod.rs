//! Public entry point of the engine.
//!
//! [`AttractorController`] validates play requests, resolves interval and
//! radius from the configured count curves, queues staggered launches and
//! advances every running token once per host tick. It owns the lifecycle
//! registry so that [`AttractorController::teardown`] can release everything
//! still outstanding.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::AttractorConfig,
    math::Vec3,
    registry::{BatchId, Handle, IdAllocator, LifecycleRegistry, TokenId},
    scene::{CoordinateProjector, TargetProvider, VisualFactory},
    timeline::{LaunchScheduler, PlaybackClock},
    token::{TokenPhase, TokenSpec, TokenTimeline},
    AttractorError, Result,
};

/// Largest burst a single play call accepts.
pub const MAX_TOKENS_PER_PLAY: usize = 10_000;

/// Completion callback. Runs on the ticking thread while the controller is
/// borrowed, so it must not call back into the controller.
pub type Callback = Box<dyn FnMut()>;

/// A burst of `count` tokens flying from `source` to a live target.
pub struct PlayRequest {
    pub count: i32,
    /// Source point in world space.
    pub source: Vec3,
    pub target: Option<Rc<dyn TargetProvider>>,
    /// Explicit spawn radius. Resolved from the radius curve when absent.
    pub radius: Option<f32>,
    /// Overrides the configured flight duration.
    pub duration: Option<f32>,
    /// Overrides the launch interval resolved from the interval curve.
    pub interval: Option<f32>,
    pub on_complete: Option<Callback>,
    pub on_all_completed: Option<Callback>,
}

impl PlayRequest {
    pub fn new(count: i32, source: Vec3) -> Self {
        Self {
            count,
            source,
            target: None,
            radius: None,
            duration: None,
            interval: None,
            on_complete: None,
            on_all_completed: None,
        }
    }

    pub fn target(self, target: impl TargetProvider + 'static) -> Self {
        self.shared_target(Rc::new(target))
    }

    pub fn shared_target(mut self, target: Rc<dyn TargetProvider>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn duration(mut self, duration: f32) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn interval(mut self, interval: f32) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Runs after every token of the request completes.
    pub fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Runs once, right after the completion callback of the last launched
    /// token.
    pub fn on_all_completed(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_all_completed = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for PlayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayRequest")
            .field("count", &self.count)
            .field("source", &self.source)
            .field("has_target", &self.target.is_some())
            .field("radius", &self.radius)
            .field("duration", &self.duration)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Bookkeeping shared by the tokens of one play call.
struct BatchState {
    count: usize,
    remaining: usize,
    source: Vec3,
    radius: f32,
    duration: f32,
    target: Rc<dyn TargetProvider>,
    on_complete: Option<Callback>,
    on_all_completed: Option<Callback>,
}

/// What happened during one [`AttractorController::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub spawned: usize,
    pub completed: usize,
}

/// Wires the collaborators of an [`AttractorController`] together.
pub struct AttractorBuilder {
    config: AttractorConfig,
    projector: Option<Box<dyn CoordinateProjector>>,
    visuals: Option<Box<dyn VisualFactory>>,
}

impl AttractorBuilder {
    pub fn new(config: AttractorConfig) -> Self {
        Self {
            config,
            projector: None,
            visuals: None,
        }
    }

    pub fn projector(mut self, projector: impl CoordinateProjector + 'static) -> Self {
        self.projector = Some(Box::new(projector));
        self
    }

    pub fn visuals(mut self, visuals: impl VisualFactory + 'static) -> Self {
        self.visuals = Some(Box::new(visuals));
        self
    }

    pub fn build(self) -> Result<AttractorController> {
        self.config.validate()?;
        let projector = self
            .projector
            .ok_or(AttractorError::MissingCollaborator("coordinate projector"))?;
        let visuals = self
            .visuals
            .ok_or(AttractorError::MissingCollaborator("visual factory"))?;

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(AttractorController {
            config: self.config,
            projector,
            visuals,
            clock: PlaybackClock::default(),
            scheduler: LaunchScheduler::new(),
            registry: LifecycleRegistry::new(),
            ids: IdAllocator::default(),
            tokens: BTreeMap::new(),
            batches: HashMap::new(),
            rng,
        })
    }
}

pub struct AttractorController {
    config: AttractorConfig,
    projector: Box<dyn CoordinateProjector>,
    visuals: Box<dyn VisualFactory>,
    clock: PlaybackClock,
    scheduler: LaunchScheduler,
    registry: LifecycleRegistry,
    ids: IdAllocator,
    tokens: BTreeMap<TokenId, TokenTimeline>,
    batches: HashMap<BatchId, BatchState>,
    rng: StdRng,
}

impl AttractorController {
    pub fn builder(config: AttractorConfig) -> AttractorBuilder {
        AttractorBuilder::new(config)
    }

    pub fn config(&self) -> &AttractorConfig {
        &self.config
    }

    /// Current time of the controller's clock, in seconds.
    pub fn now(&self) -> f64 {
        self.clock.time_seconds
    }

    pub fn resolve_interval(&self, count: i32) -> f32 {
        self.config.interval.evaluate(count)
    }

    pub fn resolve_radius(&self, count: i32) -> f32 {
        self.config.radius.evaluate(count)
    }

    /// Starts a burst, resolving the radius from the radius curve unless the
    /// request carries one.
    pub fn play(&mut self, request: PlayRequest) -> Result<BatchId> {
        let radius = match request.radius {
            Some(radius) => radius,
            None => self.resolve_radius(request.count),
        };
        self.play_with_radius(request, radius)
    }

    /// Starts a burst with an explicit spawn radius. Nothing is scheduled
    /// when the request is rejected; a count of zero is accepted and does
    /// nothing.
    pub fn play_with_radius(&mut self, request: PlayRequest, radius: f32) -> Result<BatchId> {
        let PlayRequest {
            count,
            source,
            target,
            duration,
            interval,
            on_complete,
            on_all_completed,
            ..
        } = request;

        let checked = self.check_request(count, radius, duration, interval, target);
        let (count, duration, interval, target) = match checked {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(count, radius, %err, "play request rejected");
                return Err(err);
            }
        };

        let batch = self.ids.next_batch();
        if count == 0 {
            tracing::debug!(batch = batch.0, "empty play request ignored");
            return Ok(batch);
        }

        self.batches.insert(
            batch,
            BatchState {
                count,
                remaining: count,
                source: self.projector.project_to_local(source),
                radius,
                duration,
                target,
                on_complete,
                on_all_completed,
            },
        );
        self.scheduler
            .schedule(batch, count, interval, &mut self.ids, &mut self.registry);

        tracing::info!(batch = batch.0, count, radius, interval, duration, "play");
        Ok(batch)
    }

    /// Spawns a single token right away, bypassing the launch queue.
    pub fn play_one(
        &mut self,
        source: Vec3,
        target: impl TargetProvider + 'static,
        radius: f32,
        on_complete: Option<Callback>,
    ) -> Result<TokenId> {
        let target: Rc<dyn TargetProvider> = Rc::new(target);
        let (_, duration, _, target) = self.check_request(1, radius, None, None, Some(target))?;

        let batch = self.ids.next_batch();
        self.batches.insert(
            batch,
            BatchState {
                count: 1,
                remaining: 1,
                source: self.projector.project_to_local(source),
                radius,
                duration,
                target,
                on_complete,
                on_all_completed: None,
            },
        );

        self.spawn_token(batch, 0)
            .ok_or_else(|| AttractorError::msg("batch vanished before its token spawned"))
    }

    /// Advances the clock and every running token by `dt` seconds, then counts
    /// pending launches down by `dt` and fires the ones that came due. Tokens spawned here start moving on the
    /// next tick.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.clock.advance(dt);
        let mut report = TickReport::default();

        let mut finished = Vec::new();
        for token in self.tokens.values_mut() {
            let phase = token.advance(
                dt,
                &self.config,
                &*self.projector,
                &mut *self.visuals,
                &mut self.registry,
            );
            if phase == TokenPhase::Completed {
                finished.push(token.id());
            }
        }

        for id in finished {
            if let Some(token) = self.tokens.remove(&id) {
                self.finish_token(token.batch(), token.index());
                report.completed += 1;
            }
        }

        let due = self.scheduler.take_due(dt, &mut self.registry);
        for launch in due {
            if self.spawn_token(launch.batch, launch.index).is_some() {
                report.spawned += 1;
            }
        }

        report
    }

    /// Cancels every pending launch and releases every running token without
    /// running their callbacks. Batches in flight are forgotten.
    pub fn teardown(&mut self) {
        let handles = self.registry.drain();
        let (mut cancelled, mut killed) = (0usize, 0usize);

        for handle in handles {
            match handle {
                Handle::Launch(id) => {
                    if self.scheduler.cancel(id) {
                        cancelled += 1;
                    }
                }
                Handle::Token(id) => {
                    if let Some(mut token) = self.tokens.remove(&id) {
                        if token.kill(&mut *self.visuals) {
                            killed += 1;
                        }
                    }
                }
            }
        }
        self.batches.clear();

        debug_assert!(self.tokens.is_empty(), "untracked token survived teardown");
        debug_assert!(self.scheduler.is_empty(), "untracked launch survived teardown");

        if cancelled + killed > 0 {
            tracing::info!(cancelled, killed, "teardown");
        }
    }

    pub fn active_tokens(&self) -> usize {
        self.tokens.len()
    }

    pub fn pending_launches(&self) -> usize {
        self.scheduler.len()
    }

    /// Delays of the launches of `batch` still waiting to fire.
    pub fn pending_delays(&self, batch: BatchId) -> Vec<f32> {
        self.scheduler.pending_delays(batch)
    }

    pub fn token(&self, id: TokenId) -> Option<&TokenTimeline> {
        self.tokens.get(&id)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenTimeline> {
        self.tokens.values()
    }

    /// No launch pending and no token in flight.
    pub fn is_idle(&self) -> bool {
        self.tokens.is_empty() && self.scheduler.is_empty()
    }

    fn check_request(
        &self,
        count: i32,
        radius: f32,
        duration: Option<f32>,
        interval: Option<f32>,
        target: Option<Rc<dyn TargetProvider>>,
    ) -> Result<(usize, f32, f32, Rc<dyn TargetProvider>)> {
        let target = target.ok_or(AttractorError::MissingCollaborator("target"))?;
        let resolved_count = usize::try_from(count)
            .map_err(|_| AttractorError::invalid(format!("count must not be negative, got {count}")))?;
        if resolved_count > MAX_TOKENS_PER_PLAY {
            return Err(AttractorError::invalid(format!(
                "count must be at most {MAX_TOKENS_PER_PLAY}, got {count}"
            )));
        }

        if !(radius.is_finite() && radius >= 0.0) {
            return Err(AttractorError::invalid(format!(
                "radius must be non-negative, got {radius}"
            )));
        }

        let duration = duration.unwrap_or(self.config.duration);
        if !(duration.is_finite() && duration > 0.0) {
            return Err(AttractorError::invalid(format!(
                "duration must be positive, got {duration}"
            )));
        }

        let interval = match interval {
            Some(interval) => interval,
            None => self.resolve_interval(count),
        };
        if !(interval.is_finite() && interval >= 0.0) {
            return Err(AttractorError::invalid(format!(
                "interval must be non-negative, got {interval}"
            )));
        }

        Ok((resolved_count, duration, interval, target))
    }

    fn spawn_token(&mut self, batch_id: BatchId, index: usize) -> Option<TokenId> {
        let batch = self.batches.get(&batch_id)?;

        let anchor = batch.source + random_direction(&mut self.rng) * batch.radius;
        let start_rotation = if self.config.rotation.randomize_start {
            Vec3::new(0.0, 0.0, self.rng.gen_range(0.0..360.0))
        } else {
            self.config.rotation.start
        };

        let id = self.ids.next_token();
        let spec = TokenSpec {
            batch: batch_id,
            index,
            anchor,
            start_rotation,
            duration: batch.duration,
            target: Rc::clone(&batch.target),
        };
        let token = TokenTimeline::spawn(
            id,
            spec,
            &self.config,
            &mut *self.visuals,
            &mut self.registry,
        );
        self.tokens.insert(id, token);
        Some(id)
    }

    fn finish_token(&mut self, batch_id: BatchId, index: usize) {
        let Some(batch) = self.batches.get_mut(&batch_id) else {
            return;
        };

        batch.remaining = batch.remaining.saturating_sub(1);
        if let Some(callback) = batch.on_complete.as_mut() {
            callback();
        }
        if index + 1 == batch.count {
            if let Some(mut callback) = batch.on_all_completed.take() {
                callback();
            }
        }
        if batch.remaining == 0 {
            self.batches.remove(&batch_id);
            tracing::debug!(batch = batch_id.0, "batch finished");
        }
    }
}

impl Drop for AttractorController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for AttractorController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttractorController")
            .field("now", &self.clock.time_seconds)
            .field("tokens", &self.tokens.len())
            .field("pending_launches", &self.scheduler.len())
            .field("batches", &self.batches.len())
            .finish()
    }
}

/// Uniformly distributed point on the unit sphere.
fn random_direction(rng: &mut impl Rng) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let azimuth: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let ring = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(ring * azimuth.cos(), ring * azimuth.sin(), z)
}
