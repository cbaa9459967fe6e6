//! Pixel-error tracking control: dead-band, proportional step, EMA smoothing,
//! per-axis rate limiting, joint-limit clamp.
//!
//! # Control law, per tick while TRACKING
//! 1. Signed pixel error = detection center − frame center
//! 2. Dead-band: errors strictly inside `deadband_px` are zeroed (a magnitude
//!    exactly equal to the band counts as outside)
//! 3. Proportional step on the smoothed setpoint
//! 4. EMA on the *setpoint* (smoothing and rate limiting stay independent)
//! 5. Rate limit the commanded position toward the setpoint
//! 6. Clamp to the joint limit
//!
//! Body yaw is scan-only in the baseline; `track_body_yaw` drives it through
//! the same six steps with its own gain and limit.

use crate::types::{FrameSize, HeadPose};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Gains, filters and limits for the tracking control law. Angles in
/// radians, rates in rad/s, dead-band in pixels.
#[derive(Clone, Debug)]
pub struct TrackingConfig {
    /// Proportional gain yaw (rad per pixel of horizontal error)
    pub kp_yaw: f64,
    /// Proportional gain pitch (rad per pixel of vertical error)
    pub kp_pitch: f64,
    /// Proportional gain body yaw (used only when `track_body_yaw`)
    pub kp_body: f64,
    /// EMA coefficient α ∈ (0, 1]: higher is more responsive, lower smoother
    pub smooth_alpha: f64,
    /// Pixel errors strictly below this magnitude are treated as zero
    pub deadband_px: f64,
    /// Max angular velocity per axis (rad/s)
    pub max_yaw_rate: f64,
    pub max_pitch_rate: f64,
    pub max_body_rate: f64,
    /// Symmetric joint limits per axis (rad)
    pub yaw_limit: f64,
    pub pitch_limit: f64,
    pub body_yaw_limit: f64,
    /// Drive body yaw from pixel error too (default: scan-only)
    pub track_body_yaw: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            kp_yaw: 0.002,
            kp_pitch: 0.0015,
            kp_body: 0.001,
            smooth_alpha: 0.35,
            deadband_px: 20.0,
            max_yaw_rate: 1.2,
            max_pitch_rate: 0.9,
            max_body_rate: 0.6,
            yaw_limit: 45.0_f64.to_radians(),
            pitch_limit: 30.0_f64.to_radians(),
            body_yaw_limit: 20.0_f64.to_radians(),
            track_body_yaw: false,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Mutable control state for one session. Owned exclusively by the
/// control-loop thread; mutated every tick, never shared.
#[derive(Clone, Debug)]
pub struct ControllerState {
    /// The physically commanded, rate-limited position
    pub pose: HeadPose,
    /// Smoothed, not-yet-rate-limited setpoints
    pub target_yaw: f64,
    pub target_pitch: f64,
    pub target_body_yaw: f64,
    pub last_update_time: f64,
}

impl ControllerState {
    pub fn new(now: f64) -> Self {
        Self {
            pose: HeadPose::NEUTRAL,
            target_yaw: 0.0,
            target_pitch: 0.0,
            target_body_yaw: 0.0,
            last_update_time: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Rate limiter
// ---------------------------------------------------------------------------

/// Move `current` toward `target`, bounding the step to `max_rate * dt`.
/// Shared by tracking, scanning and the shutdown neutral return so every
/// commanded value obeys the same velocity bound.
pub fn rate_limit_step(current: f64, target: f64, max_rate: f64, dt: f64) -> f64 {
    let max_delta = (max_rate * dt).abs();
    current + (target - current).clamp(-max_delta, max_delta)
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Converts a pixel-space target offset into smoothed, rate-limited,
/// joint-limited angular commands.
#[derive(Clone, Debug)]
pub struct TrackingController {
    config: TrackingConfig,
}

impl TrackingController {
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    fn deadband(&self, error: f64) -> f64 {
        if error.abs() < self.config.deadband_px {
            0.0
        } else {
            error
        }
    }

    /// One tracking tick. `center` is the detection center in pixels, `dt`
    /// the elapsed time since the previous tick.
    pub fn update(
        &self,
        state: &mut ControllerState,
        center: (f64, f64),
        frame: FrameSize,
        dt: f64,
    ) {
        let cfg = &self.config;
        let (cx, cy) = frame.center();
        let error_x = self.deadband(center.0 - cx);
        let error_y = self.deadband(center.1 - cy);

        // Steer toward the target: positive yaw is left, so an error to the
        // right (positive error_x) decreases yaw; positive pitch is down, so
        // an error below center (positive error_y) increases pitch.
        let raw_yaw = state.target_yaw - cfg.kp_yaw * error_x;
        let raw_pitch = state.target_pitch + cfg.kp_pitch * error_y;

        let a = cfg.smooth_alpha;
        state.target_yaw = a * raw_yaw + (1.0 - a) * state.target_yaw;
        state.target_pitch = a * raw_pitch + (1.0 - a) * state.target_pitch;

        state.pose.yaw = rate_limit_step(state.pose.yaw, state.target_yaw, cfg.max_yaw_rate, dt)
            .clamp(-cfg.yaw_limit, cfg.yaw_limit);
        state.pose.pitch =
            rate_limit_step(state.pose.pitch, state.target_pitch, cfg.max_pitch_rate, dt)
                .clamp(-cfg.pitch_limit, cfg.pitch_limit);

        if cfg.track_body_yaw {
            let raw_body = state.target_body_yaw - cfg.kp_body * error_x;
            state.target_body_yaw = a * raw_body + (1.0 - a) * state.target_body_yaw;
            state.pose.body_yaw = rate_limit_step(
                state.pose.body_yaw,
                state.target_body_yaw,
                cfg.max_body_rate,
                dt,
            )
            .clamp(-cfg.body_yaw_limit, cfg.body_yaw_limit);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 30.0;

    fn frame() -> FrameSize {
        FrameSize {
            width: 640,
            height: 480,
        }
    }

    fn converged_state(yaw: f64, pitch: f64) -> ControllerState {
        let mut s = ControllerState::new(0.0);
        s.pose.yaw = yaw;
        s.pose.pitch = pitch;
        s.target_yaw = yaw;
        s.target_pitch = pitch;
        s
    }

    #[test]
    fn centered_box_leaves_position_unchanged() {
        // Box (295,215)-(345,265) in a 640×480 frame: center (320,240).
        let ctl = TrackingController::new(TrackingConfig::default());
        let mut state = converged_state(0.2, -0.1);
        ctl.update(&mut state, (320.0, 240.0), frame(), DT);
        assert_eq!(state.pose.yaw, 0.2);
        assert_eq!(state.pose.pitch, -0.1);
    }

    #[test]
    fn error_beyond_deadband_steers_toward_target() {
        // Center at (100, 240): error_x = -220, well past the 20 px band.
        // The head must turn left (yaw increases) toward x=100.
        let cfg = TrackingConfig {
            kp_yaw: 0.002,
            deadband_px: 20.0,
            ..Default::default()
        };
        let ctl = TrackingController::new(cfg);
        let mut state = converged_state(0.0, 0.0);
        ctl.update(&mut state, (100.0, 240.0), frame(), DT);
        assert!(state.target_yaw > 0.0, "setpoint moves left");
        assert!(state.pose.yaw > 0.0, "commanded yaw moves left");
    }

    #[test]
    fn errors_inside_deadband_are_zeroed() {
        let ctl = TrackingController::new(TrackingConfig::default());
        let mut state = converged_state(0.0, 0.0);
        // 19.9 px right and below: strictly inside the 20 px band.
        ctl.update(&mut state, (339.9, 259.9), frame(), DT);
        assert_eq!(state.pose.yaw, 0.0);
        assert_eq!(state.pose.pitch, 0.0);
    }

    #[test]
    fn error_exactly_at_band_counts_as_outside() {
        let ctl = TrackingController::new(TrackingConfig::default());
        let mut state = converged_state(0.0, 0.0);
        ctl.update(&mut state, (340.0, 240.0), frame(), DT);
        assert!(state.pose.yaw < 0.0, "20 px error is acted upon");
    }

    #[test]
    fn per_tick_step_respects_rate_limit() {
        let cfg = TrackingConfig::default();
        let max_step = cfg.max_yaw_rate * DT;
        let ctl = TrackingController::new(cfg);
        let mut state = converged_state(0.0, 0.0);
        // Detection arrives after a burst gap: single huge correction.
        for _ in 0..5 {
            let before = state.pose.yaw;
            ctl.update(&mut state, (0.0, 240.0), frame(), DT);
            assert!(
                (state.pose.yaw - before).abs() <= max_step + 1e-12,
                "per-tick yaw step bounded"
            );
        }
    }

    #[test]
    fn commanded_position_stays_within_joint_limits() {
        let cfg = TrackingConfig::default();
        let limit = cfg.yaw_limit;
        let ctl = TrackingController::new(cfg);
        let mut state = converged_state(0.0, 0.0);
        for _ in 0..5000 {
            ctl.update(&mut state, (0.0, 0.0), frame(), DT);
            assert!(state.pose.yaw.abs() <= limit);
        }
        // With a persistent hard-left error the yaw saturates at the limit.
        assert!((state.pose.yaw - limit).abs() < 1e-9);
    }

    #[test]
    fn stationary_target_reaches_fixed_point() {
        // A centered detection stream (zero error) with an offset setpoint:
        // the rate limiter walks the pose to the setpoint and both stay put —
        // EMA and rate limiter converge to the same steady value.
        let ctl = TrackingController::new(TrackingConfig::default());
        let mut state = ControllerState::new(0.0);
        state.target_yaw = 0.3;
        for _ in 0..2000 {
            ctl.update(&mut state, (320.0, 240.0), frame(), DT);
        }
        assert!((state.pose.yaw - 0.3).abs() < 1e-12);
        assert!((state.target_yaw - 0.3).abs() < 1e-12);
        let before = state.pose.yaw;
        ctl.update(&mut state, (320.0, 240.0), frame(), DT);
        assert_eq!(state.pose.yaw, before, "fixed point holds");
    }

    #[test]
    fn body_yaw_untouched_in_baseline() {
        let ctl = TrackingController::new(TrackingConfig::default());
        let mut state = converged_state(0.0, 0.0);
        state.pose.body_yaw = 0.15;
        ctl.update(&mut state, (0.0, 240.0), frame(), DT);
        assert_eq!(state.pose.body_yaw, 0.15, "scan-only axis");
    }

    #[test]
    fn body_yaw_tracks_when_enabled() {
        let cfg = TrackingConfig {
            track_body_yaw: true,
            ..Default::default()
        };
        let ctl = TrackingController::new(cfg);
        let mut state = converged_state(0.0, 0.0);
        ctl.update(&mut state, (100.0, 240.0), frame(), DT);
        assert!(state.pose.body_yaw > 0.0);
        assert!(state.pose.body_yaw.abs() <= ctl.config().body_yaw_limit);
    }

    #[test]
    fn rate_limit_step_is_symmetric() {
        assert_eq!(rate_limit_step(0.0, 1.0, 0.5, 0.1), 0.05);
        assert_eq!(rate_limit_step(0.0, -1.0, 0.5, 0.1), -0.05);
        // Already close: lands exactly on target.
        assert_eq!(rate_limit_step(0.0, 0.01, 0.5, 0.1), 0.01);
    }
}
