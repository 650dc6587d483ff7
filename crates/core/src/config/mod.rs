use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    curve::{CurveMapping, ShapeCurve},
    math::Vec3,
    AttractorError, Result,
};

/// Top-level configuration for an attractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttractorConfig {
    /// Flight time of every token, in seconds.
    pub duration: f32,
    pub scale: ScaleTrack,
    pub fade: FadeTrack,
    pub rotation: RotationTrack,
    pub motion: MotionTrack,
    /// Delay between launches as a function of the requested count.
    pub interval: CurveMapping,
    /// Spawn radius as a function of the requested count.
    pub radius: CurveMapping,
    /// Seed for spawn anchors and randomised rotations. Entropy when absent.
    pub seed: Option<u64>,
}

impl Default for AttractorConfig {
    fn default() -> Self {
        Self {
            duration: 0.8,
            scale: ScaleTrack::default(),
            fade: FadeTrack::default(),
            rotation: RotationTrack::default(),
            motion: MotionTrack::default(),
            interval: CurveMapping::new(1, 30, 0.08, 0.02).with_curve(ShapeCurve::EaseOut),
            radius: CurveMapping::new(1, 30, 20.0, 120.0).with_curve(ShapeCurve::EaseOut),
            seed: None,
        }
    }
}

impl AttractorConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(AttractorError::invalid(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }
        if !self.fade.start.is_finite() || !self.fade.end.is_finite() {
            return Err(AttractorError::invalid("fade alpha values must be finite"));
        }
        let vectors = [
            self.scale.start,
            self.scale.end,
            self.rotation.start,
            self.rotation.end,
        ];
        if vectors.iter().any(|v| !v.is_finite()) {
            return Err(AttractorError::invalid(
                "scale and rotation values must be finite",
            ));
        }
        for curve in [
            &self.scale.curve,
            &self.fade.curve,
            &self.rotation.curve,
            &self.motion.curve,
        ] {
            curve.validate()?;
        }
        self.interval.validate_non_negative("interval")?;
        self.radius.validate_non_negative("radius")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleTrack {
    pub start: Vec3,
    pub end: Vec3,
    pub curve: ShapeCurve,
}

impl Default for ScaleTrack {
    fn default() -> Self {
        Self {
            start: Vec3::ONE,
            end: Vec3::new(0.6, 0.6, 0.6),
            curve: ShapeCurve::EaseIn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeTrack {
    pub start: f32,
    pub end: f32,
    pub curve: ShapeCurve,
}

impl Default for FadeTrack {
    fn default() -> Self {
        Self {
            start: 1.0,
            end: 1.0,
            curve: ShapeCurve::Linear,
        }
    }
}

/// Euler angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationTrack {
    pub start: Vec3,
    pub end: Vec3,
    pub curve: ShapeCurve,
    /// Replace `start` with a random angle about the z axis.
    pub randomize_start: bool,
}

impl Default for RotationTrack {
    fn default() -> Self {
        Self {
            start: Vec3::ZERO,
            end: Vec3::ZERO,
            curve: ShapeCurve::Linear,
            randomize_start: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTrack {
    pub curve: ShapeCurve,
}

impl Default for MotionTrack {
    fn default() -> Self {
        Self {
            curve: ShapeCurve::EaseInOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AttractorConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = AttractorConfig::from_json_str(
            r#"{ "duration": 1.5, "fade": { "start": 0.0 }, "seed": 9 }"#,
        )
        .unwrap();
        assert_eq!(config.duration, 1.5);
        assert_eq!(config.fade.start, 0.0);
        assert_eq!(config.fade.end, 1.0);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.radius, AttractorConfig::default().radius);
    }

    #[test]
    fn json_round_trip_keeps_curves() {
        let mut config = AttractorConfig::default();
        config.motion.curve = ShapeCurve::keyframes([(0.0, 0.0), (0.4, 0.8), (1.0, 1.0)]);
        let raw = config.to_json_string().unwrap();
        assert_eq!(AttractorConfig::from_json_str(&raw).unwrap(), config);
    }

    #[test]
    fn rejects_non_positive_duration() {
        let err = AttractorConfig::from_json_str(r#"{ "duration": 0.0 }"#).unwrap_err();
        assert!(matches!(err, AttractorError::InvalidRequest(_)));
    }

    #[test]
    fn rejects_negative_radius_mapping() {
        let mut config = AttractorConfig::default();
        config.radius.min_value = -4.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AttractorConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, AttractorError::Io(_)));
    }
}
