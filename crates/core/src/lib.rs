//! Core library for staggered token attraction effects.
//!
//! A play request spawns a burst of short-lived tokens at a source point and
//! flies each of them along a curved path to a live, possibly moving target
//! while scaling, fading and rotating it. Launches are staggered by a
//! count-dependent interval and every token is guaranteed to be released,
//! either when it lands or when the controller is torn down.
//!
//! The engine is driven by a host calling [`AttractorController::tick`] once
//! per frame; rendering, projection and target tracking are supplied through
//! the traits in [`scene`].

pub mod config;
pub mod controller;
pub mod curve;
pub mod error;
pub mod math;
pub mod path;
pub mod record;
pub mod registry;
pub mod render;
pub mod scene;
pub mod timeline;
pub mod token;

pub use config::{AttractorConfig, FadeTrack, MotionTrack, RotationTrack, ScaleTrack};
pub use controller::{
    AttractorBuilder, AttractorController, Callback, PlayRequest, TickReport, MAX_TOKENS_PER_PLAY,
};
pub use curve::{CurveMapping, Keyframe, ShapeCurve};
pub use error::{AttractorError, Result};
pub use math::Vec3;
pub use record::{FrameSnapshot, Recorder, RecordingSettings, TokenFrame};
pub use registry::{BatchId, Handle, LaunchId, LifecycleRegistry, TokenId};
pub use render::OverlayCanvas;
pub use scene::{
    CoordinateProjector, IdentityProjector, RectProjector, SharedTarget, TargetProvider,
    VisualFactory, VisualHandle, VisualTransform,
};
pub use timeline::{LaunchScheduler, PlaybackClock, ScheduledLaunch};
pub use token::{TokenPhase, TokenTimeline};
