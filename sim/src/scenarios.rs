//! Scenario definitions.
//!
//! Each scenario is a named configuration of world targets plus the control
//! and scene parameters to run them under. All scenarios are deterministic
//! given the same seed.

use crate::scene::{SceneConfig, TargetMotion, WorldTarget};
use control_core::ControlConfig;
use std::time::Duration;

/// Which pre-defined scenario to run.
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// One person standing left of the start gaze
    StaticTarget,
    /// One person walking laterally across the room
    SweepingTarget,
    /// Person appears, then leaves mid-run
    VanishingTarget,
    /// No matching target at all, only a distractor
    EmptyRoom,
    /// Slow detector with a cold-start warm-up phase
    SlowService,
}

/// A fully configured simulation run.
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    pub duration_s: f64,
    pub control: ControlConfig,
    pub scene: SceneConfig,
    pub targets: Vec<WorldTarget>,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::StaticTarget => Self::static_target(seed),
            ScenarioKind::SweepingTarget => Self::sweeping_target(seed),
            ScenarioKind::VanishingTarget => Self::vanishing_target(seed),
            ScenarioKind::EmptyRoom => Self::empty_room(seed),
            ScenarioKind::SlowService => Self::slow_service(seed),
        }
    }

    fn sim_control() -> ControlConfig {
        let mut control = ControlConfig::default();
        // Short enough that a 30 s run exercises re-acquisition.
        control.mode.reaction_cooldown_s = 4.0;
        control.source.backoff.initial_wait_s = 0.2;
        control.source.backoff.max_wait_s = 1.0;
        control
    }

    fn static_target(seed: u64) -> Self {
        Scenario {
            name: "static_target".into(),
            seed,
            duration_s: 20.0,
            control: Self::sim_control(),
            scene: SceneConfig::default(),
            targets: vec![WorldTarget::person([3.0, 1.2, 0.0])],
        }
    }

    fn sweeping_target(seed: u64) -> Self {
        let walker = WorldTarget {
            motion: TargetMotion::LateralSweep {
                amplitude_m: 2.0,
                period_s: 12.0,
            },
            ..WorldTarget::person([4.0, 0.0, 0.0])
        };
        Scenario {
            name: "sweeping_target".into(),
            seed,
            duration_s: 30.0,
            control: Self::sim_control(),
            scene: SceneConfig::default(),
            targets: vec![walker],
        }
    }

    fn vanishing_target(seed: u64) -> Self {
        let mut visitor = WorldTarget::person([3.0, -1.0, 0.0]);
        visitor.appear_at = 2.0;
        visitor.disappear_at = 10.0;
        Scenario {
            name: "vanishing_target".into(),
            seed,
            duration_s: 25.0,
            control: Self::sim_control(),
            scene: SceneConfig::default(),
            targets: vec![visitor],
        }
    }

    fn empty_room(seed: u64) -> Self {
        // Wrong label: filtering must reject it and the head keeps scanning.
        let cat = WorldTarget {
            label: "cat".into(),
            score: 0.95,
            width_m: 0.4,
            height_m: 0.3,
            ..WorldTarget::person([2.5, 0.5, -0.8])
        };
        Scenario {
            name: "empty_room".into(),
            seed,
            duration_s: 15.0,
            control: Self::sim_control(),
            scene: SceneConfig::default(),
            targets: vec![cat],
        }
    }

    fn slow_service(seed: u64) -> Self {
        let scene = SceneConfig {
            detect_latency: Duration::from_millis(400),
            warmup_failures: 3,
            ..SceneConfig::default()
        };
        Scenario {
            name: "slow_service".into(),
            seed,
            duration_s: 25.0,
            control: Self::sim_control(),
            scene,
            targets: vec![WorldTarget::person([3.5, 0.8, 0.0])],
        }
    }
}
