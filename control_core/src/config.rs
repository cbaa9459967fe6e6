//! Process-level configuration: one immutable struct composed of the
//! per-component configs, loaded once at startup.
//!
//! Overrides come from `GAZETRACK_*` environment variables with explicit
//! defaults; there is no hot reload. Angular variables are given in degrees
//! (`*_DEG`) and normalized to radians here — everything downstream of this
//! module works in radians.

use crate::controller::TrackingConfig;
use crate::mode::ModeConfig;
use crate::scan::ScanConfig;
use crate::source::SourceConfig;
use crate::types::FrameSize;
use std::str::FromStr;
use tracing::warn;

/// Full configuration for one control session.
#[derive(Clone, Debug)]
pub struct ControlConfig {
    /// Control loop rate (Hz), decoupled from the detection cadence
    pub control_hz: f64,
    /// Frame capture / detection submission rate (Hz)
    pub detection_hz: f64,
    /// Camera frame dimensions (the zero-error point derives from these)
    pub frame: FrameSize,
    /// Duration of the shutdown neutral-return transition (s)
    pub shutdown_return_s: f64,
    /// Period of the periodic status log line (s)
    pub status_log_period_s: f64,
    pub source: SourceConfig,
    pub mode: ModeConfig,
    pub tracking: TrackingConfig,
    pub scan: ScanConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            control_hz: 30.0,
            detection_hz: 2.0,
            frame: FrameSize::default(),
            shutdown_return_s: 1.0,
            status_log_period_s: 3.0,
            source: SourceConfig::default(),
            mode: ModeConfig::default(),
            tracking: TrackingConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

impl ControlConfig {
    /// Defaults overridden by any `GAZETRACK_*` variables present in the
    /// environment. Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_parse::<String>("GAZETRACK_LABEL") {
            cfg.source.target_label = v;
        }
        if let Some(v) = env_parse("GAZETRACK_CONF") {
            cfg.source.confidence_floor = v;
        }
        if let Some(v) = env_parse("GAZETRACK_STALENESS_S") {
            cfg.source.staleness_ceiling_s = v;
        }
        if let Some(v) = env_parse("GAZETRACK_DETECTION_HZ") {
            cfg.detection_hz = v;
        }
        if let Some(v) = env_parse("GAZETRACK_CONTROL_HZ") {
            cfg.control_hz = v;
        }
        if let Some(v) = env_parse("GAZETRACK_LOST_TIMEOUT_S") {
            cfg.mode.lost_timeout_s = v;
        }
        if let Some(v) = env_parse("GAZETRACK_COOLDOWN_S") {
            cfg.mode.reaction_cooldown_s = v;
        }
        if let Some(v) = env_parse("GAZETRACK_DEADBAND_PX") {
            cfg.tracking.deadband_px = v;
        }
        if let Some(v) = env_parse("GAZETRACK_KP_YAW") {
            cfg.tracking.kp_yaw = v;
        }
        if let Some(v) = env_parse("GAZETRACK_KP_PITCH") {
            cfg.tracking.kp_pitch = v;
        }
        if let Some(v) = env_parse::<f64>("GAZETRACK_ALPHA") {
            if v > 0.0 && v <= 1.0 {
                cfg.tracking.smooth_alpha = v;
            } else {
                warn!(alpha = v, "GAZETRACK_ALPHA must be in (0, 1], keeping default");
            }
        }
        if let Some(v) = env_parse::<f64>("GAZETRACK_MAX_YAW_RATE_DEG") {
            cfg.tracking.max_yaw_rate = v.to_radians();
        }
        if let Some(v) = env_parse::<f64>("GAZETRACK_MAX_PITCH_RATE_DEG") {
            cfg.tracking.max_pitch_rate = v.to_radians();
        }
        if let Some(v) = env_parse::<f64>("GAZETRACK_YAW_LIMIT_DEG") {
            cfg.tracking.yaw_limit = v.to_radians();
        }
        if let Some(v) = env_parse::<f64>("GAZETRACK_PITCH_LIMIT_DEG") {
            cfg.tracking.pitch_limit = v.to_radians();
        }
        if let Some(v) = env_parse("GAZETRACK_TRACK_BODY_YAW") {
            cfg.tracking.track_body_yaw = v;
        }
        if let Some(v) = env_parse::<f64>("GAZETRACK_SCAN_AMP_DEG") {
            cfg.scan.yaw_amplitude = v.to_radians();
        }
        if let Some(v) = env_parse("GAZETRACK_SCAN_PERIOD_S") {
            cfg.scan.period_s = v;
        }
        if let Some(v) = env_parse::<f64>("GAZETRACK_SCAN_PITCH_DEG") {
            cfg.scan.pitch_base = v.to_radians();
        }
        if let Some(v) = env_parse("GAZETRACK_FRAME_WIDTH") {
            cfg.frame.width = v;
        }
        if let Some(v) = env_parse("GAZETRACK_FRAME_HEIGHT") {
            cfg.frame.height = v;
        }

        cfg
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "ignoring unparsable environment override");
                None
            }
        },
        Err(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_coherent() {
        let cfg = ControlConfig::default();
        assert!(cfg.control_hz > cfg.detection_hz);
        assert!(cfg.tracking.smooth_alpha > 0.0 && cfg.tracking.smooth_alpha <= 1.0);
        assert!(cfg.source.staleness_ceiling_s > cfg.mode.lost_timeout_s);
    }

    #[test]
    fn env_overrides_apply_and_normalize_degrees() {
        std::env::set_var("GAZETRACK_LABEL", "dog");
        std::env::set_var("GAZETRACK_SCAN_AMP_DEG", "30");
        std::env::set_var("GAZETRACK_CONTROL_HZ", "15");
        let cfg = ControlConfig::from_env();
        assert_eq!(cfg.source.target_label, "dog");
        assert!((cfg.scan.yaw_amplitude - 30.0_f64.to_radians()).abs() < 1e-12);
        assert_eq!(cfg.control_hz, 15.0);
        std::env::remove_var("GAZETRACK_LABEL");
        std::env::remove_var("GAZETRACK_SCAN_AMP_DEG");
        std::env::remove_var("GAZETRACK_CONTROL_HZ");
    }

    #[test]
    fn unparsable_override_is_ignored() {
        std::env::set_var("GAZETRACK_DEADBAND_PX", "lots");
        let cfg = ControlConfig::from_env();
        assert_eq!(cfg.tracking.deadband_px, TrackingConfig::default().deadband_px);
        std::env::remove_var("GAZETRACK_DEADBAND_PX");
    }
}
