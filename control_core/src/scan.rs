//! Idle scan pattern: deterministic, time-based sweep per axis.
//!
//! Yaw and body yaw follow sinusoids of the same period (body lagging by a
//! fixed phase offset), pitch holds a small downward bias with a
//! double-frequency ripple. The generator only produces *targets*; the
//! scheduler routes them through the tracking rate limiter so a mode switch
//! never snaps.

use crate::types::HeadPose;
use std::f64::consts::TAU;

/// Scan sweep parameters. Angles in radians.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Yaw sweep amplitude
    pub yaw_amplitude: f64,
    /// Full sweep period (s), shared by yaw and body yaw
    pub period_s: f64,
    /// Body yaw sweep amplitude
    pub body_amplitude: f64,
    /// Body yaw phase lag behind head yaw (rad)
    pub body_phase_lag: f64,
    /// Constant downward pitch bias
    pub pitch_base: f64,
    /// Amplitude of the double-frequency pitch ripple
    pub pitch_variation: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            yaw_amplitude: 25.0_f64.to_radians(),
            period_s: 6.0,
            body_amplitude: 15.0_f64.to_radians(),
            body_phase_lag: 0.3,
            pitch_base: 5.0_f64.to_radians(),
            pitch_variation: 3.0_f64.to_radians(),
        }
    }
}

/// Produces the instantaneous sweep target for a given monotonic time.
#[derive(Clone, Debug)]
pub struct ScanPatternGenerator {
    config: ScanConfig,
    start_time: f64,
}

impl ScanPatternGenerator {
    pub fn new(config: ScanConfig, now: f64) -> Self {
        Self {
            config,
            start_time: now,
        }
    }

    /// Restart the sweep in phase (called on the TRACKING → SCANNING
    /// transition so the sweep begins at its zero crossing).
    pub fn restart(&mut self, now: f64) {
        self.start_time = now;
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Instantaneous sweep target at `now`.
    pub fn target_at(&self, now: f64) -> HeadPose {
        let cfg = &self.config;
        let phase = TAU * (now - self.start_time) / cfg.period_s;
        HeadPose {
            yaw: cfg.yaw_amplitude * phase.sin(),
            pitch: cfg.pitch_base + cfg.pitch_variation * (2.0 * phase).sin(),
            body_yaw: cfg.body_amplitude * (phase - cfg.body_phase_lag).sin(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
