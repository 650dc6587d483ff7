use serde::{Deserialize, Serialize};

use crate::registry::{BatchId, Handle, IdAllocator, LaunchId, LifecycleRegistry};

/// Monotonic clock advanced by the host once per frame. Kept in `f64` so
/// frame-sized steps still register after days of uptime.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    /// Negative or non-finite deltas are ignored so time never runs backwards.
    pub fn advance(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.time_seconds += f64::from(delta);
        }
    }
}

/// A token launch waiting for its delay to elapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledLaunch {
    pub id: LaunchId,
    pub batch: BatchId,
    pub index: usize,
    /// Delay relative to the play call that scheduled it.
    pub delay: f32,
    /// Time left before the launch fires. Counted down by every tick.
    pub remaining: f32,
}

/// Queue of delayed launches keyed by the playback clock.
#[derive(Debug, Default)]
pub struct LaunchScheduler {
    launches: Vec<ScheduledLaunch>,
}

impl LaunchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `count` launches for `batch`, spaced `interval` seconds apart
    /// starting now. The delay accumulates from launch to launch. Every
    /// launch is registered before this returns.
    pub fn schedule(
        &mut self,
        batch: BatchId,
        count: usize,
        interval: f32,
        ids: &mut IdAllocator,
        registry: &mut LifecycleRegistry,
    ) -> Vec<LaunchId> {
        let mut scheduled = Vec::with_capacity(count);
        let mut delay = 0.0_f32;

        for index in 0..count {
            let id = ids.next_launch();
            registry.register(Handle::Launch(id));
            self.launches.push(ScheduledLaunch {
                id,
                batch,
                index,
                delay,
                remaining: delay,
            });
            scheduled.push(id);
            delay += interval;
        }

        self.launches
            .sort_by(|a, b| a.remaining.total_cmp(&b.remaining).then(a.id.cmp(&b.id)));
        tracing::debug!(?batch, count, interval, "scheduled launches");
        scheduled
    }

    /// Counts every pending launch down by `dt`, then removes and returns
    /// the ones whose delay has run out, earliest first. Launches whose
    /// registry entry is already gone were cancelled and are dropped
    /// silently.
    pub fn take_due(&mut self, dt: f32, registry: &mut LifecycleRegistry) -> Vec<ScheduledLaunch> {
        if dt.is_finite() && dt > 0.0 {
            for launch in &mut self.launches {
                launch.remaining -= dt;
            }
        }

        let split = self
            .launches
            .iter()
            .position(|launch| launch.remaining > 0.0)
            .unwrap_or(self.launches.len());

        self.launches
            .drain(..split)
            .filter(|launch| registry.release(Handle::Launch(launch.id)))
            .collect()
    }

    /// Drops a pending launch. Returns `false` if it had already fired or was
    /// never scheduled.
    pub fn cancel(&mut self, id: LaunchId) -> bool {
        let before = self.launches.len();
        self.launches.retain(|launch| launch.id != id);
        before != self.launches.len()
    }

    pub fn len(&self) -> usize {
        self.launches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.launches.is_empty()
    }

    pub fn pending(&self) -> &[ScheduledLaunch] {
        &self.launches
    }

    /// Delays of the launches of `batch` that have not fired yet, in index
    /// order.
    pub fn pending_delays(&self, batch: BatchId) -> Vec<f32> {
        let mut launches: Vec<&ScheduledLaunch> = self
            .launches
            .iter()
            .filter(|launch| launch.batch == batch)
            .collect();
        launches.sort_by_key(|launch| launch.index);
        launches.into_iter().map(|launch| launch.delay).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (LaunchScheduler, IdAllocator, LifecycleRegistry) {
        (
            LaunchScheduler::new(),
            IdAllocator::default(),
            LifecycleRegistry::new(),
        )
    }

    #[test]
    fn clock_ignores_negative_deltas() {
        let mut clock = PlaybackClock::default();
        clock.advance(0.5);
        clock.advance(-3.0);
        clock.advance(f32::NAN);
        assert_eq!(clock.time_seconds, 0.5);
        clock.reset();
        assert_eq!(clock.time_seconds, 0.0);
    }

    #[test]
    fn delays_accumulate_per_index() {
        let (mut scheduler, mut ids, mut registry) = setup();
        let batch = ids.next_batch();
        let launched = scheduler.schedule(batch, 3, 0.2, &mut ids, &mut registry);

        assert_eq!(launched.len(), 3);
        assert_eq!(registry.pending_launches(), 3);
        assert_eq!(scheduler.pending_delays(batch), vec![0.0, 0.2, 0.4]);
    }

    #[test]
    fn fires_in_order_once_due() {
        let (mut scheduler, mut ids, mut registry) = setup();
        let batch = ids.next_batch();
        scheduler.schedule(batch, 3, 0.5, &mut ids, &mut registry);

        let first = scheduler.take_due(0.0, &mut registry);
        assert_eq!(first.iter().map(|l| l.index).collect::<Vec<_>>(), vec![0]);

        assert!(scheduler.take_due(0.25, &mut registry).is_empty());
        let rest = scheduler.take_due(2.0, &mut registry);
        assert_eq!(rest.iter().map(|l| l.index).collect::<Vec<_>>(), vec![1, 2]);
        assert!(scheduler.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn countdown_does_not_depend_on_absolute_time() {
        let (mut scheduler, mut ids, mut registry) = setup();
        let mut clock = PlaybackClock::default();
        clock.advance(524_288.0);

        let batch = ids.next_batch();
        scheduler.schedule(batch, 2, 0.2, &mut ids, &mut registry);
        assert_eq!(scheduler.take_due(0.0, &mut registry).len(), 1);

        let mut fired = 0;
        for _ in 0..30 {
            clock.advance(1.0 / 60.0);
            fired += scheduler.take_due(1.0 / 60.0, &mut registry).len();
        }
        assert_eq!(fired, 1);
        assert!(clock.time_seconds > 524_288.0);
    }

    #[test]
    fn zero_interval_fires_everything_together() {
        let (mut scheduler, mut ids, mut registry) = setup();
        let batch = ids.next_batch();
        scheduler.schedule(batch, 4, 0.0, &mut ids, &mut registry);
        assert_eq!(scheduler.take_due(0.0, &mut registry).len(), 4);
    }

    #[test]
    fn released_launches_do_not_fire() {
        let (mut scheduler, mut ids, mut registry) = setup();
        let batch = ids.next_batch();
        let launched = scheduler.schedule(batch, 2, 0.0, &mut ids, &mut registry);

        registry.release(Handle::Launch(launched[0]));
        let fired = scheduler.take_due(0.0, &mut registry);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, launched[1]);
    }

    #[test]
    fn cancel_removes_pending_launch() {
        let (mut scheduler, mut ids, mut registry) = setup();
        let batch = ids.next_batch();
        let launched = scheduler.schedule(batch, 2, 1.0, &mut ids, &mut registry);
        assert!(scheduler.cancel(launched[1]));
        assert!(!scheduler.cancel(launched[1]));
        assert_eq!(scheduler.len(), 1);
    }
}
