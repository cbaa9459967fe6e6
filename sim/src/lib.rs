//! `sim` — Closed-loop scene simulator: world targets, a pose-following
//! camera, scripted detector faults, scenario runs and trace logs.

pub mod recorder;
pub mod runner;
pub mod scenarios;
pub mod scene;
pub mod trace;

pub use recorder::{CommandRecord, RecordingSink, SharedPose};
pub use runner::ScenarioReport;
pub use scenarios::{Scenario, ScenarioKind};
pub use scene::{SceneConfig, SimulatedScene, TargetMotion, WorldTarget};
pub use trace::{load_trace, save_trace, ReactionRecord, TraceLog};
