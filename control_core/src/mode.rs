//! Mode state machine: SCANNING ↔ TRACKING with a reaction cooldown.
//!
//! # Transition policy
//! - **SCANNING → TRACKING**: a detection is present, its age is below
//!   `lost_timeout_s`, and no cooldown window is active. The transition
//!   raises a one-shot reaction signal and opens a cooldown window.
//! - **TRACKING → SCANNING**: the cooldown has expired and either no
//!   detection is present or its age has reached `lost_timeout_s`.
//! - While the cooldown is active neither transition fires: the reaction
//!   cannot re-trigger, and the machine cannot flicker back to SCANNING.
//!
//! The machine is deterministic given (state, detection presence, age, now);
//! the only clock is the caller's monotonic timestamp.

use serde::{Deserialize, Serialize};

/// Controller operating mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Idle sweep, looking for a target
    Scanning,
    /// Steering the head toward the detected target
    Tracking,
}

/// Configuration for mode transitions.
#[derive(Clone, Debug)]
pub struct ModeConfig {
    /// Detection age (s) at which the target counts as lost
    pub lost_timeout_s: f64,
    /// Cooldown window (s) opened on entering TRACKING
    pub reaction_cooldown_s: f64,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            lost_timeout_s: 1.5,
            reaction_cooldown_s: 8.0,
        }
    }
}

/// Outcome of one mode step.
#[derive(Clone, Copy, Debug)]
pub struct ModeStep {
    pub mode: ControlMode,
    /// One-shot reaction signal: true exactly on SCANNING → TRACKING
    pub entered_tracking: bool,
    /// True exactly on TRACKING → SCANNING (scan phase restarts, slot clears)
    pub entered_scanning: bool,
}

/// The two-state machine deciding TRACKING vs. SCANNING each tick.
#[derive(Clone, Debug)]
pub struct ModeStateMachine {
    config: ModeConfig,
    mode: ControlMode,
    cooldown_until: f64,
}

impl ModeStateMachine {
    pub fn new(config: ModeConfig) -> Self {
        Self {
            config,
            mode: ControlMode::Scanning,
            cooldown_until: f64::NEG_INFINITY,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Whether the post-reaction cooldown window is still open at `now`.
    pub fn in_cooldown(&self, now: f64) -> bool {
        now < self.cooldown_until
    }

    /// Advance the machine by one tick.
    pub fn step(&mut self, now: f64, detection_present: bool, age_s: f64) -> ModeStep {
        let fresh = detection_present && age_s < self.config.lost_timeout_s;
        let cooling = self.in_cooldown(now);

        let mut entered_tracking = false;
        let mut entered_scanning = false;

        match self.mode {
            ControlMode::Scanning => {
                if fresh && !cooling {
                    self.mode = ControlMode::Tracking;
                    self.cooldown_until = now + self.config.reaction_cooldown_s;
                    entered_tracking = true;
                }
            }
            ControlMode::Tracking => {
                if !fresh && !cooling {
                    self.mode = ControlMode::Scanning;
                    entered_scanning = true;
                }
            }
        }

        ModeStep {
            mode: self.mode,
            entered_tracking,
            entered_scanning,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(lost: f64, cooldown: f64) -> ModeStateMachine {
        ModeStateMachine::new(ModeConfig {
            lost_timeout_s: lost,
            reaction_cooldown_s: cooldown,
        })
    }

    #[test]
    fn reaches_and_stays_in_tracking_on_fresh_stream() {
        let mut m = machine(1.5, 5.0);
        let step = m.step(0.0, true, 0.1);
        assert_eq!(step.mode, ControlMode::Tracking);
        assert!(step.entered_tracking, "reaction fires on entry");

        // Fresh detections keep arriving: mode never leaves TRACKING and the
        // reaction never re-fires.
        for i in 1..200 {
            let t = i as f64 * 0.1;
            let step = m.step(t, true, 0.1);
            assert_eq!(step.mode, ControlMode::Tracking);
            assert!(!step.entered_tracking);
        }
    }

    #[test]
    fn returns_to_scanning_after_lost_timeout() {
        let mut m = machine(1.5, 2.0);
        m.step(0.0, true, 0.0);
        assert_eq!(m.mode(), ControlMode::Tracking);

        // Target disappears at t=0; age grows from there. The cooldown holds
        // the machine in TRACKING until t=2.0 even though age passes the
        // timeout at t=1.5.
        let step = m.step(1.9, false, 1.9);
        assert_eq!(step.mode, ControlMode::Tracking, "held by cooldown");

        let step = m.step(2.1, false, 2.1);
        assert_eq!(step.mode, ControlMode::Scanning);
        assert!(step.entered_scanning);
    }

    #[test]
    fn stale_detection_counts_as_lost() {
        let mut m = machine(1.5, 0.0);
        m.step(0.0, true, 0.0);
        // A cached detection whose age reached the timeout is not fresh.
        let step = m.step(1.0, true, 1.5);
        assert_eq!(step.mode, ControlMode::Scanning);
    }

    #[test]
    fn reaction_never_fires_during_cooldown() {
        let mut m = machine(1.5, 5.0);
        assert!(m.step(0.0, true, 0.0).entered_tracking);

        // Drop back to scanning right after the cooldown, then feed fresh
        // detections while a second cooldown from the first entry would still
        // be open in a buggy implementation.
        let step = m.step(5.1, false, 5.1);
        assert!(step.entered_scanning);

        // Fresh detection immediately re-enters tracking (cooldown expired).
        let step = m.step(5.2, true, 0.1);
        assert!(step.entered_tracking, "exactly one reaction per entry");

        // And during the new cooldown nothing re-fires even if the target
        // flickers in and out.
        let step = m.step(5.3, false, 9.0);
        assert_eq!(step.mode, ControlMode::Tracking);
        let step = m.step(5.4, true, 0.1);
        assert!(!step.entered_tracking);
    }

    #[test]
    fn retrigger_allowed_only_after_cooldown_expiry() {
        let mut m = machine(1.5, 4.0);
        m.step(0.0, true, 0.0);
        m.step(4.1, false, 4.1);
        assert_eq!(m.mode(), ControlMode::Scanning);
        // Cooldown has expired, so a fresh target may trigger a new reaction.
        assert!(m.step(4.2, true, 0.1).entered_tracking);
        // The new window holds until 8.2; the next loss then drops to
        // scanning again.
        let step = m.step(8.3, false, 2.0);
        assert!(step.entered_scanning);
    }

    #[test]
    fn deterministic_given_same_inputs() {
        let mut a = machine(1.5, 3.0);
        let mut b = machine(1.5, 3.0);
        let stream = [
            (0.0, false, f64::INFINITY),
            (0.1, true, 0.05),
            (0.2, true, 0.15),
            (3.2, false, 3.0),
            (3.3, true, 0.1),
        ];
        for (t, present, age) in stream {
            let sa = a.step(t, present, age);
            let sb = b.step(t, present, age);
            assert_eq!(sa.mode, sb.mode);
            assert_eq!(sa.entered_tracking, sb.entered_tracking);
        }
    }
}
