//! Life of a single token from spawn to release.
//!
//! Every token runs four tracks off one shared progress value: scale, fade,
//! rotation and position. Each track eases the progress through its own curve.
//! The position track re-reads the target every tick, so a moving target drags
//! the end of the path along with it.

use std::fmt;
use std::rc::Rc;

use crate::{
    config::AttractorConfig,
    math::Vec3,
    path,
    registry::{BatchId, Handle, LifecycleRegistry, TokenId},
    scene::{CoordinateProjector, TargetProvider, VisualFactory, VisualHandle, VisualTransform},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPhase {
    Spawned,
    Animating,
    /// Reached the end of its duration. Terminal.
    Completed,
    /// Released by a forced teardown. Terminal.
    Killed,
}

impl TokenPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Killed)
    }
}

/// Everything needed to spawn one token.
pub struct TokenSpec {
    pub batch: BatchId,
    pub index: usize,
    /// Spawn anchor in overlay space.
    pub anchor: Vec3,
    pub start_rotation: Vec3,
    pub duration: f32,
    pub target: Rc<dyn TargetProvider>,
}

pub struct TokenTimeline {
    id: TokenId,
    batch: BatchId,
    index: usize,
    visual: VisualHandle,
    anchor: Vec3,
    start_rotation: Vec3,
    duration: f32,
    elapsed: f32,
    target: Rc<dyn TargetProvider>,
    phase: TokenPhase,
    transform: VisualTransform,
}

impl TokenTimeline {
    /// Creates the visual instance at the anchor, applies the start values of
    /// every track and registers the timeline.
    pub fn spawn(
        id: TokenId,
        spec: TokenSpec,
        config: &AttractorConfig,
        visuals: &mut dyn VisualFactory,
        registry: &mut LifecycleRegistry,
    ) -> Self {
        let visual = visuals.create(spec.anchor);
        let transform = VisualTransform {
            position: spec.anchor,
            scale: config.scale.start,
            rotation: spec.start_rotation,
            alpha: config.fade.start,
        };
        visuals.apply(visual, &transform);
        registry.register(Handle::Token(id));

        tracing::debug!(token = id.0, batch = spec.batch.0, index = spec.index, "token spawned");

        Self {
            id,
            batch: spec.batch,
            index: spec.index,
            visual,
            anchor: spec.anchor,
            start_rotation: spec.start_rotation,
            duration: spec.duration,
            elapsed: 0.0,
            target: spec.target,
            phase: TokenPhase::Spawned,
            transform,
        }
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn batch(&self) -> BatchId {
        self.batch
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn visual(&self) -> VisualHandle {
        self.visual
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn phase(&self) -> TokenPhase {
        self.phase
    }

    pub fn transform(&self) -> &VisualTransform {
        &self.transform
    }

    /// Shared progress of all four tracks in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Moves the timeline forward by `dt` seconds and pushes the resulting
    /// transform to the visual. On reaching the end the visual is destroyed
    /// and the registry entry released.
    pub fn advance(
        &mut self,
        dt: f32,
        config: &AttractorConfig,
        projector: &dyn CoordinateProjector,
        visuals: &mut dyn VisualFactory,
        registry: &mut LifecycleRegistry,
    ) -> TokenPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }

        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        self.phase = TokenPhase::Animating;

        let progress = self.progress();
        self.transform = self.evaluate(progress, config, projector);
        visuals.apply(self.visual, &self.transform);

        if progress >= 1.0 {
            visuals.destroy(self.visual);
            registry.release(Handle::Token(self.id));
            self.phase = TokenPhase::Completed;
            tracing::debug!(token = self.id.0, batch = self.batch.0, index = self.index, "token completed");
        }

        self.phase
    }

    /// Releases the visual without completing. Returns `false` when the
    /// timeline had already reached a terminal phase.
    pub fn kill(&mut self, visuals: &mut dyn VisualFactory) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        visuals.destroy(self.visual);
        self.phase = TokenPhase::Killed;
        tracing::debug!(token = self.id.0, "token killed");
        true
    }

    fn evaluate(
        &self,
        progress: f32,
        config: &AttractorConfig,
        projector: &dyn CoordinateProjector,
    ) -> VisualTransform {
        let target = projector.project_to_local(self.target.current_location());

        VisualTransform {
            position: path::interpolate(self.anchor, target, config.motion.curve.sample(progress)),
            scale: config
                .scale
                .start
                .lerp(config.scale.end, config.scale.curve.sample(progress)),
            rotation: self
                .start_rotation
                .lerp(config.rotation.end, config.rotation.curve.sample(progress)),
            alpha: crate::math::lerp_f32(
                config.fade.start,
                config.fade.end,
                config.fade.curve.sample(progress),
            ),
        }
    }
}

impl fmt::Debug for TokenTimeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenTimeline")
            .field("id", &self.id)
            .field("batch", &self.batch)
            .field("index", &self.index)
            .field("visual", &self.visual)
            .field("phase", &self.phase)
            .field("progress", &self.progress())
            .finish()
    }
}
