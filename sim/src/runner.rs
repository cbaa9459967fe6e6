//! Scenario runner: wires a scene, detection source, capture pump and
//! control loop together and runs them in real time for the scenario
//! duration.

use crate::recorder::{RecordingSink, SharedPose};
use crate::scenarios::Scenario;
use crate::scene::SimulatedScene;
use crate::trace::{ReactionRecord, TraceLog};
use control_core::mode::ControlMode;
use control_core::scheduler::ControlLoop;
use control_core::source::{run_capture_pump, DetectionSource};
use control_core::types::Clock;
use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Outcome of one scenario run.
pub struct ScenarioReport {
    pub name: String,
    pub seed: u64,
    pub elapsed_s: f64,
    pub ticks: usize,
    pub final_mode: ControlMode,
    pub trace: TraceLog,
}

/// Run a scenario to completion. `stop` may be raised externally (Ctrl-C)
/// to end the run early through the normal shutdown path. Returns early only
/// on an actuator failure.
pub fn run(scenario: Scenario, stop: Arc<AtomicBool>) -> anyhow::Result<ScenarioReport> {
    let clock = Clock::new();
    let shared = SharedPose::default();

    let scene = SimulatedScene::new(
        scenario.scene,
        scenario.targets,
        shared.clone(),
        clock,
        scenario.seed,
    );
    let (mut camera, detector) = scene.split();
    let source = DetectionSource::spawn(
        scenario.control.source.clone(),
        detector,
        clock,
        Arc::clone(&stop),
    );

    let (reaction_tx, reaction_rx) = unbounded();
    let mut ctl = ControlLoop::new(scenario.control.clone(), clock, Some(reaction_tx));
    let mut sink = RecordingSink::new(shared, clock);

    let detection_hz = scenario.control.detection_hz;
    let duration_s = scenario.duration_s;
    info!(name = %scenario.name, seed = scenario.seed, duration_s, "starting scenario");

    let started = Instant::now();
    let loop_result = thread::scope(|s| {
        s.spawn(|| run_capture_pump(&mut camera, &source, detection_hz, &stop));
        s.spawn(|| {
            while started.elapsed().as_secs_f64() < duration_s && !stop.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(20));
            }
            stop.store(true, Ordering::Relaxed);
        });
        let out = ctl.run(&source, &mut sink, &stop);
        // Unblocks the helper threads even when the loop failed early.
        stop.store(true, Ordering::Relaxed);
        out
    });
    let elapsed_s = started.elapsed().as_secs_f64();
    source.join();
    loop_result?;

    let reactions: Vec<ReactionRecord> = reaction_rx
        .try_iter()
        .map(|event| ReactionRecord {
            time: event.at,
            label: event.label,
            score: event.score,
        })
        .collect();

    let ticks = sink.commands.len();
    Ok(ScenarioReport {
        name: scenario.name.clone(),
        seed: scenario.seed,
        elapsed_s,
        ticks,
        final_mode: ctl.mode(),
        trace: TraceLog {
            scenario_name: scenario.name,
            seed: scenario.seed,
            duration_s,
            commands: sink.commands,
            reactions,
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneConfig, WorldTarget};
    use control_core::ControlConfig;

    fn run_to_report(scenario: Scenario) -> ScenarioReport {
        run(scenario, Arc::new(AtomicBool::new(false))).unwrap()
    }

    /// Compressed time constants so a full acquire/lose cycle fits in a
    /// couple of wall-clock seconds.
    fn quick_scenario(name: &str, targets: Vec<WorldTarget>, duration_s: f64) -> Scenario {
        let mut control = ControlConfig::default();
        control.control_hz = 60.0;
        control.detection_hz = 15.0;
        control.shutdown_return_s = 0.1;
        control.mode.lost_timeout_s = 0.4;
        control.mode.reaction_cooldown_s = 0.5;
        control.source.backoff.initial_wait_s = 0.05;
        control.source.backoff.max_wait_s = 0.2;
        let scene = SceneConfig {
            miss_probability: 0.0,
            center_noise_px: 1.0,
            detect_latency: Duration::from_millis(15),
            ..SceneConfig::default()
        };
        Scenario {
            name: name.into(),
            seed: 7,
            duration_s,
            control,
            scene,
            targets,
        }
    }

    #[test]
    fn static_target_is_acquired_and_centered() {
        let scenario = quick_scenario(
            "static",
            vec![WorldTarget::person([3.0, 1.2, 0.0])],
            2.5,
        );
        let report = run_to_report(scenario);

        assert_eq!(report.trace.reactions.len(), 1, "exactly one acquisition");
        assert_eq!(report.final_mode, ControlMode::Tracking);
        assert!(report.ticks > 100);

        // The head settled near the target bearing at some point of the run.
        let bearing = (1.2_f64).atan2(3.0);
        let closest = report
            .trace
            .commands
            .iter()
            .map(|c| (c.yaw - bearing).abs())
            .fold(f64::INFINITY, f64::min);
        assert!(closest < 0.08, "closest yaw error {closest} rad");
    }

    #[test]
    fn vanishing_target_sends_the_head_back_to_scanning() {
        let mut visitor = WorldTarget::person([3.0, -1.0, 0.0]);
        visitor.disappear_at = 0.8;
        let scenario = quick_scenario("vanish", vec![visitor], 3.0);
        let report = run_to_report(scenario);

        assert_eq!(report.trace.reactions.len(), 1);
        assert_eq!(report.final_mode, ControlMode::Scanning);
    }

    #[test]
    fn wrong_label_never_triggers_tracking() {
        let cat = WorldTarget {
            label: "cat".into(),
            ..WorldTarget::person([2.5, 0.5, 0.0])
        };
        let scenario = quick_scenario("distractor", vec![cat], 1.5);
        let report = run_to_report(scenario);

        assert!(report.trace.reactions.is_empty());
        assert_eq!(report.final_mode, ControlMode::Scanning);
        let yaw_limit = ControlConfig::default().tracking.yaw_limit;
        for command in &report.trace.commands {
            assert!(command.yaw.abs() <= yaw_limit + 1e-9);
        }
    }

    #[test]
    fn cold_starting_detector_still_acquires() {
        let mut scenario = quick_scenario(
            "cold_start",
            vec![WorldTarget::person([3.5, 0.8, 0.0])],
            2.0,
        );
        scenario.scene.warmup_failures = 2;
        let report = run_to_report(scenario);

        assert_eq!(report.trace.reactions.len(), 1);
        assert_eq!(report.final_mode, ControlMode::Tracking);
    }

    #[test]
    fn every_run_ends_on_a_neutral_command() {
        let scenario = quick_scenario(
            "neutral_end",
            vec![WorldTarget::person([3.0, 1.0, 0.0])],
            1.5,
        );
        let report = run_to_report(scenario);
        let last = report.trace.commands.last().unwrap();
        assert_eq!(last.yaw, 0.0);
        assert_eq!(last.pitch, 0.0);
        assert_eq!(last.body_yaw, 0.0);
    }
}
