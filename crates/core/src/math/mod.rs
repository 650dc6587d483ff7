//! Vector type used for positions, scales and Euler rotations.
//!
//! Overlay space is two dimensional but positions keep a depth component so
//! that spawn anchors and the spherical motion path can use all three axes.

pub use glam::Vec3;

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_both_ends() {
        let a = Vec3::new(1.0, -2.0, 3.0);
        let b = Vec3::new(-4.0, 5.0, 0.5);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 0.5), Vec3::new(-1.5, 1.5, 1.75));
        assert_eq!(lerp_f32(2.0, 6.0, 0.25), 3.0);
    }

    #[test]
    fn length_and_distance() {
        assert_eq!(Vec3::new(3.0, 4.0, 0.0).length(), 5.0);
        assert_eq!(Vec3::ONE.distance(Vec3::ONE), 0.0);
    }

    #[test]
    fn serializes_as_a_component_array() {
        let json = serde_json::to_string(&Vec3::new(1.0, 2.5, -3.0)).unwrap();
        assert_eq!(json, "[1.0,2.5,-3.0]");
        let back: Vec3 = serde_json::from_str("[0.0,0.0,30.0]").unwrap();
        assert_eq!(back, Vec3::new(0.0, 0.0, 30.0));
    }
}
