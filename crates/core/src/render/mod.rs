use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{
    math::Vec3,
    scene::{VisualFactory, VisualHandle, VisualTransform},
    Result,
};

#[derive(Debug, Default)]
struct CanvasState {
    next_handle: u64,
    instances: BTreeMap<VisualHandle, VisualTransform>,
    created: usize,
    destroyed: usize,
    stale_destroys: usize,
}

/// In-memory overlay used by the command line driver and by tests. It keeps
/// the latest transform of every live instance and counts creations and
/// destructions. Clones share the same canvas.
#[derive(Debug, Clone, Default)]
pub struct OverlayCanvas {
    shared: Rc<RefCell<CanvasState>>,
}

impl OverlayCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.shared.borrow().instances.len()
    }

    pub fn created(&self) -> usize {
        self.shared.borrow().created
    }

    pub fn destroyed(&self) -> usize {
        self.shared.borrow().destroyed
    }

    /// Destroy calls for handles that were not live.
    pub fn stale_destroys(&self) -> usize {
        self.shared.borrow().stale_destroys
    }

    pub fn transform(&self, handle: VisualHandle) -> Option<VisualTransform> {
        self.shared.borrow().instances.get(&handle).copied()
    }

    /// Live instances ordered by handle.
    pub fn snapshot(&self) -> Vec<(VisualHandle, VisualTransform)> {
        self.shared
            .borrow()
            .instances
            .iter()
            .map(|(handle, transform)| (*handle, *transform))
            .collect()
    }

    pub fn draw(&self) -> Result<()> {
        let state = self.shared.borrow();
        for (handle, transform) in &state.instances {
            tracing::trace!(
                handle = handle.0,
                x = transform.position.x,
                y = transform.position.y,
                alpha = transform.alpha,
                "draw"
            );
        }
        Ok(())
    }
}

impl VisualFactory for OverlayCanvas {
    fn create(&mut self, anchor: Vec3) -> VisualHandle {
        let mut state = self.shared.borrow_mut();
        let handle = VisualHandle(state.next_handle);
        state.next_handle += 1;
        state.created += 1;
        state.instances.insert(
            handle,
            VisualTransform {
                position: anchor,
                ..VisualTransform::default()
            },
        );
        handle
    }

    fn apply(&mut self, handle: VisualHandle, transform: &VisualTransform) {
        if let Some(slot) = self.shared.borrow_mut().instances.get_mut(&handle) {
            *slot = *transform;
        }
    }

    fn destroy(&mut self, handle: VisualHandle) {
        let mut state = self.shared.borrow_mut();
        if state.instances.remove(&handle).is_some() {
            state.destroyed += 1;
        } else {
            state.stale_destroys += 1;
            tracing::warn!(handle = handle.0, "destroy requested for unknown visual");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lifecycle_counts() {
        let canvas = OverlayCanvas::new();
        let mut factory = canvas.clone();

        let a = factory.create(Vec3::new(1.0, 2.0, 0.0));
        let b = factory.create(Vec3::ZERO);
        assert_ne!(a, b);
        assert_eq!(canvas.live_count(), 2);
        assert_eq!(canvas.transform(a).unwrap().position, Vec3::new(1.0, 2.0, 0.0));

        factory.destroy(a);
        factory.destroy(a);
        assert_eq!(canvas.live_count(), 1);
        assert_eq!(canvas.destroyed(), 1);
        assert_eq!(canvas.stale_destroys(), 1);
        assert!(canvas.draw().is_ok());
    }

    #[test]
    fn apply_overwrites_live_transform() {
        let canvas = OverlayCanvas::new();
        let mut factory = canvas.clone();
        let handle = factory.create(Vec3::ZERO);
        let transform = VisualTransform {
            alpha: 0.25,
            ..VisualTransform::default()
        };
        factory.apply(handle, &transform);
        assert_eq!(canvas.snapshot(), vec![(handle, transform)]);
    }
}
