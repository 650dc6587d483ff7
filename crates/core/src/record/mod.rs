use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    scene::{VisualHandle, VisualTransform},
    AttractorError, Result,
};

/// Configuration options for frame recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_path: String,
    /// Maximum number of captured frames per second of clock time.
    pub fps: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_path: String::new(),
            fps: 60,
        }
    }
}

/// State of one live visual at a captured instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenFrame {
    pub visual: VisualHandle,
    pub transform: VisualTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub time: f64,
    pub tokens: Vec<TokenFrame>,
}

/// Collects overlay snapshots while recording and writes them out as JSON.
#[derive(Debug, Default)]
pub struct Recorder {
    settings: RecordingSettings,
    is_recording: bool,
    last_capture: Option<f64>,
    frames: Vec<FrameSnapshot>,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            is_recording: false,
            last_capture: None,
            frames: Vec::new(),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.settings.fps == 0 {
            return Err(AttractorError::invalid("recording fps must be positive"));
        }
        self.is_recording = true;
        self.last_capture = None;
        self.frames.clear();
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.is_recording = false;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    /// Stores a snapshot unless the previous one is closer than one frame
    /// period. Returns whether the snapshot was kept.
    pub fn capture(
        &mut self,
        time: f64,
        live: impl IntoIterator<Item = (VisualHandle, VisualTransform)>,
    ) -> bool {
        if !self.is_recording {
            return false;
        }
        let period = 1.0 / f64::from(self.settings.fps);
        if let Some(last) = self.last_capture {
            if time - last < period {
                return false;
            }
        }

        self.last_capture = Some(time);
        self.frames.push(FrameSnapshot {
            time,
            tokens: live
                .into_iter()
                .map(|(visual, transform)| TokenFrame { visual, transform })
                .collect(),
        });
        true
    }

    pub fn frames(&self) -> &[FrameSnapshot] {
        &self.frames
    }

    /// Writes the captured frames to the configured output path.
    pub fn write(&self) -> Result<()> {
        if self.settings.output_path.is_empty() {
            return Err(AttractorError::msg("recording output path is not set"));
        }
        self.write_to(&self.settings.output_path)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.frames)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> Vec<(VisualHandle, VisualTransform)> {
        vec![(VisualHandle(0), VisualTransform::default())]
    }

    #[test]
    fn ignores_frames_while_stopped() {
        let mut recorder = Recorder::new(RecordingSettings::default());
        assert!(!recorder.capture(0.0, live()));
        assert!(recorder.frames().is_empty());
    }

    #[test]
    fn throttles_to_frame_rate() {
        let mut recorder = Recorder::new(RecordingSettings {
            fps: 10,
            ..RecordingSettings::default()
        });
        recorder.start().unwrap();

        assert!(recorder.capture(0.0, live()));
        assert!(!recorder.capture(0.05, live()));
        assert!(recorder.capture(0.1, live()));
        recorder.stop().unwrap();
        assert!(!recorder.capture(5.0, live()));

        assert_eq!(recorder.frames().len(), 2);
        assert_eq!(recorder.frames()[1].tokens.len(), 1);
    }

    #[test]
    fn rejects_zero_fps() {
        let mut recorder = Recorder::new(RecordingSettings {
            fps: 0,
            ..RecordingSettings::default()
        });
        assert!(recorder.start().is_err());
    }

    #[test]
    fn write_requires_a_path() {
        let recorder = Recorder::new(RecordingSettings::default());
        assert!(recorder.write().is_err());
    }
}
