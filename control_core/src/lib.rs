//! `control_core` — Perception-to-motion control for a pan/tilt/body-yaw head.
//!
//! # Module layout
//! - [`types`]      — Fundamental types (detections, frames, poses, clock)
//! - [`error`]      — Transient/hard detection failures, actuator failures
//! - [`config`]     — Immutable process configuration, env overrides
//! - [`slot`]       — The single guarded slot between the two cadences
//! - [`source`]     — Background detection worker, backoff, capture pump
//! - [`mode`]       — SCANNING ↔ TRACKING state machine with cooldown
//! - [`controller`] — Dead-band / proportional / EMA / rate-limit / clamp
//! - [`scan`]       — Deterministic idle sweep trajectory
//! - [`scheduler`]  — Fixed-rate control loop and shutdown transition

pub mod config;
pub mod controller;
pub mod error;
pub mod mode;
pub mod scan;
pub mod scheduler;
pub mod slot;
pub mod source;
pub mod types;

pub use config::ControlConfig;
pub use controller::{ControllerState, TrackingConfig, TrackingController};
pub use error::{ControlError, DetectError};
pub use mode::{ControlMode, ModeConfig, ModeStateMachine};
pub use scan::{ScanConfig, ScanPatternGenerator};
pub use scheduler::{ActuatorSink, ControlLoop, ReactionEvent, TickOutput};
pub use slot::DetectionSlot;
pub use source::{
    run_capture_pump, BackoffConfig, DetectionService, DetectionSource, FrameSource, SourceConfig,
};
pub use types::{BoundingBox, Clock, Detection, Frame, FrameSize, HeadPose};
