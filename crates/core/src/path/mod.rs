//! Curved trajectory between two overlay points.
//!
//! Both endpoints are expressed in spherical coordinates about the overlay
//! origin (radius, polar angle from +Y, azimuth in the XZ plane). Each
//! component is interpolated on its own and the result converted back, which
//! bends the path into an arc whose curvature follows the angular separation
//! of the endpoints instead of following the straight chord.

use crate::math::{lerp_f32, Vec3};

const MIN_RADIUS: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    polar: f32,
    azimuth: f32,
}

impl Spherical {
    /// Returns `None` for points too close to the origin to carry angles.
    fn from_point(point: Vec3) -> Option<Self> {
        let radius = point.length();
        if radius <= MIN_RADIUS || !radius.is_finite() {
            return None;
        }
        Some(Self {
            radius,
            polar: (point.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: point.z.atan2(point.x),
        })
    }

    fn to_point(self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        Vec3::new(
            self.radius * sin_polar * cos_azimuth,
            self.radius * cos_polar,
            self.radius * sin_polar * sin_azimuth,
        )
    }
}

/// Interpolates from `start` to `end` along the spherical arc at `t`.
///
/// `t <= 0` returns `start` and `t >= 1` returns `end` exactly. An endpoint at
/// the origin borrows the angles of the other endpoint, so the path collapses
/// to a radial line; both at the origin stays at the origin.
pub fn interpolate(start: Vec3, end: Vec3, t: f32) -> Vec3 {
    if t <= 0.0 || t.is_nan() {
        return start;
    }
    if t >= 1.0 {
        return end;
    }

    let (from, to) = match (Spherical::from_point(start), Spherical::from_point(end)) {
        (Some(from), Some(to)) => (from, to),
        (Some(from), None) => (
            from,
            Spherical {
                radius: 0.0,
                ..from
            },
        ),
        (None, Some(to)) => (Spherical { radius: 0.0, ..to }, to),
        (None, None) => return start.lerp(end, t),
    };

    Spherical {
        radius: lerp_f32(from.radius, to.radius, t),
        polar: lerp_f32(from.polar, to.polar, t),
        azimuth: lerp_f32(from.azimuth, to.azimuth, t),
    }
    .to_point()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < 1e-3, "{a:?} != {b:?}");
    }

    #[test]
    fn endpoints_are_exact() {
        let a = Vec3::new(-120.0, 35.0, 0.0);
        let b = Vec3::new(240.0, -80.0, 0.0);
        assert_eq!(interpolate(a, b, 0.0), a);
        assert_eq!(interpolate(a, b, 1.0), b);
        assert_eq!(interpolate(a, b, -3.0), a);
        assert_eq!(interpolate(a, b, 7.0), b);
    }

    #[test]
    fn midpoint_arcs_away_from_chord() {
        let a = Vec3::new(100.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 100.0, 0.0);
        let mid = interpolate(a, b, 0.5);

        // Constant radius keeps the midpoint on the circle, not on the chord.
        assert!((mid.length() - 100.0).abs() < 1e-3);
        let chord_mid = a.lerp(b, 0.5);
        assert!(mid.length() > chord_mid.length() + 1.0);
    }

    #[test]
    fn origin_endpoint_moves_radially() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 10.0, 0.0);
        assert_close(interpolate(a, b, 0.25), Vec3::new(0.0, 2.5, 0.0));
        assert_close(interpolate(b, a, 0.25), Vec3::new(0.0, 7.5, 0.0));
    }

    #[test]
    fn both_endpoints_at_origin_stay_put() {
        let p = interpolate(Vec3::ZERO, Vec3::ZERO, 0.5);
        assert_eq!(p, Vec3::ZERO);
    }

    #[test]
    fn progress_is_continuous() {
        let a = Vec3::new(-50.0, 20.0, 5.0);
        let b = Vec3::new(80.0, 60.0, -5.0);
        let mut previous = interpolate(a, b, 0.0);
        for step in 1..=100 {
            let next = interpolate(a, b, step as f32 / 100.0);
            assert!(next.is_finite());
            assert!(previous.distance(next) < 10.0);
            previous = next;
        }
    }
}
