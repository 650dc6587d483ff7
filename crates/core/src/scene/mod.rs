//! Contracts with the systems the engine drives but does not own: the
//! projection from world to overlay space, the provider of the live target
//! point and the factory that creates and destroys visual instances.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Converts world positions into the overlay's local coordinate space.
pub trait CoordinateProjector {
    fn project_to_local(&self, world: Vec3) -> Vec3;
}

/// Overlay whose local space is the world space.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjector;

impl CoordinateProjector for IdentityProjector {
    fn project_to_local(&self, world: Vec3) -> Vec3 {
        world
    }
}

/// Screen-space overlay rectangle: world points are offset by the rectangle
/// origin, scaled and flattened onto the overlay plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectProjector {
    pub origin: Vec3,
    pub scale: f32,
}

impl RectProjector {
    pub fn new(origin: Vec3, scale: f32) -> Self {
        Self { origin, scale }
    }
}

impl CoordinateProjector for RectProjector {
    fn project_to_local(&self, world: Vec3) -> Vec3 {
        let local = (world - self.origin) * self.scale;
        Vec3::new(local.x, local.y, 0.0)
    }
}

/// Live point a token flies towards. Polled on every progress tick.
pub trait TargetProvider {
    fn current_location(&self) -> Vec3;
}

impl TargetProvider for Vec3 {
    fn current_location(&self) -> Vec3 {
        *self
    }
}

/// Target that can be moved while tokens are in flight. Clones share the
/// same point.
#[derive(Debug, Clone, Default)]
pub struct SharedTarget {
    location: Rc<Cell<Vec3>>,
}

impl SharedTarget {
    pub fn new(location: Vec3) -> Self {
        Self {
            location: Rc::new(Cell::new(location)),
        }
    }

    pub fn set(&self, location: Vec3) {
        self.location.set(location);
    }

    pub fn get(&self) -> Vec3 {
        self.location.get()
    }
}

impl TargetProvider for SharedTarget {
    fn current_location(&self) -> Vec3 {
        self.get()
    }
}

/// Handle to a visual instance owned by a [`VisualFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(pub u64);

/// Properties the engine writes to a visual instance every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualTransform {
    pub position: Vec3,
    pub scale: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    pub alpha: f32,
}

impl Default for VisualTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
            alpha: 1.0,
        }
    }
}

/// Creates and destroys the visual instance behind each token. The engine
/// calls `create` exactly once per token and `destroy` exactly once for every
/// handle it created.
pub trait VisualFactory {
    fn create(&mut self, anchor: Vec3) -> VisualHandle;
    fn apply(&mut self, handle: VisualHandle, transform: &VisualTransform);
    fn destroy(&mut self, handle: VisualHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_projector_flattens_and_scales() {
        let projector = RectProjector::new(Vec3::new(100.0, 50.0, 0.0), 0.5);
        let local = projector.project_to_local(Vec3::new(120.0, 10.0, 9.0));
        assert_eq!(local, Vec3::new(10.0, -20.0, 0.0));
    }

    #[test]
    fn shared_target_clones_observe_moves() {
        let target = SharedTarget::new(Vec3::ZERO);
        let observer = target.clone();
        target.set(Vec3::new(4.0, 2.0, 0.0));
        assert_eq!(observer.current_location(), Vec3::new(4.0, 2.0, 0.0));
    }
}
