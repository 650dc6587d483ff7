//! Shape curves and count driven value mapping.
//!
//! A [`ShapeCurve`] maps a normalised input in `[0, 1]` to an output value. The
//! same curves drive per-track easing inside a token timeline and the
//! count-to-value remapping performed by [`CurveMapping`] for launch intervals
//! and spawn radii.

use serde::{Deserialize, Serialize};

use crate::{math::lerp_f32, AttractorError, Result};

/// Single control point of a user defined curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

impl Keyframe {
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Monotonicity-agnostic mapping from a normalised input to an output value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeCurve {
    Linear,
    /// Cubic acceleration.
    EaseIn,
    /// Cubic deceleration.
    EaseOut,
    EaseInOut,
    Constant(f32),
    /// Piecewise linear curve through the given keyframes. Inputs before the
    /// first or after the last keyframe hold the edge value.
    Keyframes(Vec<Keyframe>),
}

impl Default for ShapeCurve {
    fn default() -> Self {
        Self::Linear
    }
}

impl ShapeCurve {
    /// Builds a keyframed curve, sorting the points by time.
    pub fn keyframes(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<Keyframe> = points
            .into_iter()
            .map(|(time, value)| Keyframe::new(time, value))
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self::Keyframes(keys)
    }

    /// Samples the curve at `t`. Inputs are clamped into `[0, 1]`.
    pub fn sample(&self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t * t,
            Self::EaseOut => {
                let t1 = t - 1.0;
                t1 * t1 * t1 + 1.0
            }
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let t1 = 2.0 * t - 2.0;
                    0.5 * t1 * t1 * t1 + 1.0
                }
            }
            Self::Constant(value) => *value,
            Self::Keyframes(keys) => sample_keyframes(keys, t),
        }
    }

    /// Lowest and highest value the curve can produce over `[0, 1]`.
    pub fn value_range(&self) -> (f32, f32) {
        match self {
            Self::Linear | Self::EaseIn | Self::EaseOut | Self::EaseInOut => (0.0, 1.0),
            Self::Constant(value) => (*value, *value),
            Self::Keyframes(keys) if keys.is_empty() => (0.0, 0.0),
            Self::Keyframes(keys) => keys.iter().fold((f32::MAX, f32::MIN), |(lo, hi), key| {
                (lo.min(key.value), hi.max(key.value))
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Constant(value) if !value.is_finite() => {
                Err(AttractorError::invalid("constant curve value must be finite"))
            }
            Self::Keyframes(keys) if keys.is_empty() => {
                Err(AttractorError::invalid("keyframed curve needs at least one key"))
            }
            Self::Keyframes(keys)
                if keys
                    .iter()
                    .any(|key| !key.time.is_finite() || !key.value.is_finite()) =>
            {
                Err(AttractorError::invalid("curve keyframes must be finite"))
            }
            _ => Ok(()),
        }
    }
}

fn sample_keyframes(keys: &[Keyframe], t: f32) -> f32 {
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };

    if t <= first.time {
        return first.value;
    }
    if t >= last.time {
        return last.value;
    }

    for pair in keys.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.time && t <= b.time {
            let span = b.time - a.time;
            if span <= f32::EPSILON {
                return b.value;
            }
            return lerp_f32(a.value, b.value, (t - a.time) / span);
        }
    }

    last.value
}

/// Remaps `count` into `[min_value, max_value]` through `curve`.
///
/// The count is clamped into `[min_count, max_count]` and normalised, the curve
/// is sampled at the normalised position and the curve's own output range is
/// stretched onto the requested value range. A degenerate count range yields
/// `min_value`. Curves with a flat output range are read as already
/// normalised.
pub fn evaluate(
    curve: &ShapeCurve,
    min_count: i32,
    max_count: i32,
    count: i32,
    min_value: f32,
    max_value: f32,
) -> f32 {
    if min_count == max_count || !min_value.is_finite() || !max_value.is_finite() {
        return min_value;
    }

    let (lo, hi) = (min_count.min(max_count), min_count.max(max_count));
    let clamped = count.clamp(lo, hi);
    let t = (i64::from(clamped) - i64::from(lo)) as f32 / (i64::from(hi) - i64::from(lo)) as f32;
    let sampled = curve.sample(t);

    let (curve_lo, curve_hi) = curve.value_range();
    let normalised = if curve_hi - curve_lo > f32::EPSILON {
        (sampled - curve_lo) / (curve_hi - curve_lo)
    } else {
        sampled
    };

    // Rounding in the lerp must not push the result past either bound.
    let value = lerp_f32(min_value, max_value, normalised.clamp(0.0, 1.0));
    value.clamp(min_value.min(max_value), min_value.max(max_value))
}

/// Count driven remapping used for launch intervals and spawn radii.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveMapping {
    pub min_count: i32,
    pub max_count: i32,
    pub min_value: f32,
    pub max_value: f32,
    #[serde(default)]
    pub curve: ShapeCurve,
}

impl CurveMapping {
    pub fn new(min_count: i32, max_count: i32, min_value: f32, max_value: f32) -> Self {
        Self {
            min_count,
            max_count,
            min_value,
            max_value,
            curve: ShapeCurve::Linear,
        }
    }

    pub fn with_curve(mut self, curve: ShapeCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn evaluate(&self, count: i32) -> f32 {
        evaluate(
            &self.curve,
            self.min_count,
            self.max_count,
            count,
            self.min_value,
            self.max_value,
        )
    }

    /// Checks ordering and that every produced value is non-negative.
    pub fn validate_non_negative(&self, label: &str) -> Result<()> {
        self.curve.validate()?;
        if self.min_count > self.max_count {
            return Err(AttractorError::invalid(format!(
                "{label} mapping has min_count {} above max_count {}",
                self.min_count, self.max_count
            )));
        }
        let values_ok = [self.min_value, self.max_value]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0);
        if !values_ok {
            return Err(AttractorError::invalid(format!(
                "{label} mapping values must be finite and non-negative"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_pin_their_endpoints() {
        for curve in [
            ShapeCurve::Linear,
            ShapeCurve::EaseIn,
            ShapeCurve::EaseOut,
            ShapeCurve::EaseInOut,
        ] {
            assert_eq!(curve.sample(0.0), 0.0, "{curve:?}");
            assert_eq!(curve.sample(1.0), 1.0, "{curve:?}");
        }
    }

    #[test]
    fn keyframes_interpolate_and_hold_edges() {
        let curve = ShapeCurve::keyframes([(1.0, 0.0), (0.0, 1.0), (0.5, 0.25)]);
        assert_eq!(curve.sample(0.0), 1.0);
        assert_eq!(curve.sample(0.25), 0.625);
        assert_eq!(curve.sample(1.0), 0.0);
        assert_eq!(curve.sample(2.0), 0.0);
        assert_eq!(curve.value_range(), (0.0, 1.0));
    }

    #[test]
    fn degenerate_count_range_returns_min_value() {
        assert_eq!(evaluate(&ShapeCurve::Linear, 4, 4, 10, 0.3, 0.9), 0.3);
    }

    #[test]
    fn clamps_count_into_range() {
        let mapping = CurveMapping::new(1, 11, 0.0, 2.0);
        assert_eq!(mapping.evaluate(-50), 0.0);
        assert_eq!(mapping.evaluate(6), 1.0);
        assert!((mapping.evaluate(500) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn never_leaves_value_range_for_unit_curves() {
        let curves = [
            ShapeCurve::Linear,
            ShapeCurve::EaseIn,
            ShapeCurve::EaseOut,
            ShapeCurve::EaseInOut,
            ShapeCurve::keyframes([(0.0, 0.0), (0.3, 1.0), (1.0, 0.2)]),
        ];
        for curve in &curves {
            for count in -5..40 {
                let value = evaluate(curve, 1, 20, count, 0.5, 0.05);
                assert!((0.05..=0.5).contains(&value), "{curve:?} {count} -> {value}");
            }
        }
    }

    #[test]
    fn remaps_the_curve_output_range() {
        let curve = ShapeCurve::keyframes([(0.0, 10.0), (1.0, 20.0)]);
        let value = evaluate(&curve, 0, 10, 5, 100.0, 200.0);
        assert!((value - 150.0).abs() < 1e-4);
    }

    #[test]
    fn full_i32_count_range_stays_in_range() {
        for count in [i32::MIN, -1, 0, 5, i32::MAX] {
            let value = evaluate(&ShapeCurve::Linear, i32::MIN, i32::MAX, count, 0.0, 1.0);
            assert!(value.is_finite());
            assert!((0.0..=1.0).contains(&value), "{count} -> {value}");
        }
        assert_eq!(evaluate(&ShapeCurve::Linear, i32::MIN, i32::MAX, i32::MAX, 0.0, 1.0), 1.0);
    }

    #[test]
    fn evaluation_is_pure() {
        let mapping = CurveMapping::new(1, 30, 0.2, 0.02).with_curve(ShapeCurve::EaseOut);
        let first = mapping.evaluate(7);
        for _ in 0..10 {
            assert_eq!(mapping.evaluate(7), first);
        }
    }

    #[test]
    fn rejects_negative_values() {
        let mapping = CurveMapping::new(1, 10, -1.0, 2.0);
        assert!(mapping.validate_non_negative("radius").is_err());
        assert!(CurveMapping::new(5, 1, 0.0, 1.0)
            .validate_non_negative("interval")
            .is_err());
    }
}
