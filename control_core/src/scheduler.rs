//! The fixed-rate control loop: reads the latest detection, steps the mode
//! machine, dispatches to tracking or scanning, and emits exactly one
//! non-blocking actuator command per tick.
//!
//! All potentially slow work lives in the detection worker; nothing here may
//! suspend for longer than one tick period except the final shutdown
//! transition, which walks every axis back to neutral before the loop exits.

use crate::config::ControlConfig;
use crate::controller::{rate_limit_step, ControllerState, TrackingController};
use crate::error::ControlError;
use crate::mode::{ControlMode, ModeStateMachine};
use crate::scan::ScanPatternGenerator;
use crate::source::DetectionSource;
use crate::types::{Clock, Detection, HeadPose};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// External collaborators
// ---------------------------------------------------------------------------

/// The actuator. Commands are applied immediately and interpolated by the
/// collaborator; completion is never awaited.
pub trait ActuatorSink {
    fn set_target(&mut self, pose: &HeadPose) -> Result<(), ControlError>;
}

/// One-shot signal raised on the SCANNING → TRACKING transition. The
/// consumer (sound/motion playback, telemetry, ...) runs in its own context;
/// delivery never blocks the control thread.
#[derive(Clone, Debug)]
pub struct ReactionEvent {
    /// Monotonic time of the transition (s)
    pub at: f64,
    pub label: String,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Control loop
// ---------------------------------------------------------------------------

/// Output of one control tick (separated from the driver for testability).
#[derive(Clone, Debug)]
pub struct TickOutput {
    pub pose: HeadPose,
    pub mode: ControlMode,
    pub reaction: Option<ReactionEvent>,
    pub entered_scanning: bool,
}

/// Fixed-rate driver owning the controller state. Single writer: only the
/// control thread ever touches the state.
pub struct ControlLoop {
    config: ControlConfig,
    clock: Clock,
    mode: ModeStateMachine,
    controller: TrackingController,
    scan: ScanPatternGenerator,
    state: ControllerState,
    reaction_tx: Option<Sender<ReactionEvent>>,
    last_status_time: f64,
}

impl ControlLoop {
    pub fn new(config: ControlConfig, clock: Clock, reaction_tx: Option<Sender<ReactionEvent>>) -> Self {
        let now = clock.now();
        Self {
            mode: ModeStateMachine::new(config.mode.clone()),
            controller: TrackingController::new(config.tracking.clone()),
            scan: ScanPatternGenerator::new(config.scan.clone(), now),
            state: ControllerState::new(now),
            config,
            clock,
            reaction_tx,
            last_status_time: now,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode.mode()
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Phase origin of the current scan sweep.
    pub fn scan_start_time(&self) -> f64 {
        self.scan.start_time()
    }

    /// One control tick at monotonic time `now`.
    pub fn tick(&mut self, now: f64, detection: Option<&Detection>, age_s: f64) -> TickOutput {
        let dt = (now - self.state.last_update_time).max(0.0);
        self.state.last_update_time = now;

        let step = self.mode.step(now, detection.is_some(), age_s);
        if step.entered_scanning {
            self.scan.restart(now);
        }
        if step.entered_tracking {
            // Start the smoothed setpoints from the commanded position so the
            // first tracking tick corrects from where the head actually is.
            self.state.target_yaw = self.state.pose.yaw;
            self.state.target_pitch = self.state.pose.pitch;
            self.state.target_body_yaw = self.state.pose.body_yaw;
        }

        let reaction = match (step.entered_tracking, detection) {
            (true, Some(det)) => Some(ReactionEvent {
                at: now,
                label: det.label.clone(),
                score: det.score,
            }),
            _ => None,
        };

        match step.mode {
            ControlMode::Tracking => {
                if let Some(det) = detection {
                    self.controller
                        .update(&mut self.state, det.center(), self.config.frame, dt);
                }
                // No detection while the cooldown holds TRACKING: hold the
                // last commanded position.
            }
            ControlMode::Scanning => self.scan_step(now, dt),
        }

        TickOutput {
            pose: self.state.pose,
            mode: step.mode,
            reaction,
            entered_scanning: step.entered_scanning,
        }
    }

    /// Rate-limit the commanded pose toward the instantaneous sweep target,
    /// then clamp. Routing the sinusoid through the same limiter as tracking
    /// makes the first scanning tick after a mode switch glide instead of
    /// snapping.
    fn scan_step(&mut self, now: f64, dt: f64) {
        let cfg = self.controller.config();
        let target = self.scan.target_at(now);
        let pose = &mut self.state.pose;
        pose.yaw = rate_limit_step(pose.yaw, target.yaw, cfg.max_yaw_rate, dt)
            .clamp(-cfg.yaw_limit, cfg.yaw_limit);
        pose.pitch = rate_limit_step(pose.pitch, target.pitch, cfg.max_pitch_rate, dt)
            .clamp(-cfg.pitch_limit, cfg.pitch_limit);
        pose.body_yaw = rate_limit_step(pose.body_yaw, target.body_yaw, cfg.max_body_rate, dt)
            .clamp(-cfg.body_yaw_limit, cfg.body_yaw_limit);
        // Keep the setpoints glued to the commanded pose while scanning.
        self.state.target_yaw = pose.yaw;
        self.state.target_pitch = pose.pitch;
        self.state.target_body_yaw = pose.body_yaw;
    }

    /// Drive the loop until `stop` is raised, then run the neutral-return
    /// transition. Only an actuator failure terminates early.
    pub fn run<S: ActuatorSink>(
        &mut self,
        source: &DetectionSource,
        sink: &mut S,
        stop: &AtomicBool,
    ) -> Result<(), ControlError> {
        let period = Duration::from_secs_f64(1.0 / self.config.control_hz.max(1.0));

        while !stop.load(Ordering::Relaxed) {
            let tick_started = Instant::now();
            let now = self.clock.now();

            let (detection, age_s) = source.poll();
            let out = self.tick(now, detection.as_ref(), age_s);

            if out.entered_scanning {
                source.clear();
                info!("target lost, resuming scan");
            }
            if let Some(event) = out.reaction {
                info!(label = %event.label, score = event.score, "target acquired");
                if let Some(tx) = &self.reaction_tx {
                    let _ = tx.send(event);
                }
            }

            sink.set_target(&out.pose)?;
            self.maybe_log_status(now, out.mode);

            let elapsed = tick_started.elapsed();
            if elapsed < period {
                thread::sleep(period - elapsed);
            }
        }

        debug!("stop requested, returning to neutral");
        self.return_to_neutral(sink)
    }

    fn maybe_log_status(&mut self, now: f64, mode: ControlMode) {
        if now - self.last_status_time < self.config.status_log_period_s {
            return;
        }
        self.last_status_time = now;
        let pose = &self.state.pose;
        info!(
            ?mode,
            yaw_deg = format_args!("{:.1}", pose.yaw.to_degrees()),
            pitch_deg = format_args!("{:.1}", pose.pitch.to_degrees()),
            body_deg = format_args!("{:.1}", pose.body_yaw.to_degrees()),
            "status"
        );
    }

    /// Final shutdown transition: interpolate all axes to neutral over
    /// `shutdown_return_s` at the control cadence, ending on an exact
    /// neutral command.
    fn return_to_neutral<S: ActuatorSink>(&mut self, sink: &mut S) -> Result<(), ControlError> {
        let duration = self.config.shutdown_return_s.max(1e-3);
        let hz = self.config.control_hz.max(1.0);
        let steps = ((duration * hz).ceil() as u32).max(1);
        let period = Duration::from_secs_f64(1.0 / hz);
        let start = self.state.pose;

        for i in 1..=steps {
            let t = f64::from(i) / f64::from(steps);
            let pose = HeadPose {
                yaw: start.yaw * (1.0 - t),
                pitch: start.pitch * (1.0 - t),
                body_yaw: start.body_yaw * (1.0 - t),
            };
            sink.set_target(&pose)?;
            self.state.pose = pose;
            if i < steps {
                thread::sleep(period);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
