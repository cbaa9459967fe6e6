//! Trace logs: serialize a full simulated run for offline analysis.

use crate::recorder::CommandRecord;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded run: every actuator command plus every acquisition event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceLog {
    pub scenario_name: String,
    pub seed: u64,
    pub duration_s: f64,
    /// All actuator commands in chronological order
    pub commands: Vec<CommandRecord>,
    pub reactions: Vec<ReactionRecord>,
}

/// One target-acquisition event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub time: f64,
    pub label: String,
    pub score: f64,
}

/// Save a trace log to a JSON file.
pub fn save_trace(log: &TraceLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a trace log from a JSON file.
pub fn load_trace(path: &Path) -> anyhow::Result<TraceLog> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: TraceLog = serde_json::from_reader(reader)?;
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_survives_a_save_load_cycle() {
        let log = TraceLog {
            scenario_name: "static_target".into(),
            seed: 42,
            duration_s: 2.0,
            commands: vec![CommandRecord {
                time: 0.033,
                yaw: 0.01,
                pitch: -0.002,
                body_yaw: 0.0,
            }],
            reactions: vec![ReactionRecord {
                time: 0.5,
                label: "person".into(),
                score: 0.9,
            }],
        };
        let path = std::env::temp_dir().join(format!("gazetrack_trace_{}.json", std::process::id()));
        save_trace(&log, &path).unwrap();
        let loaded = load_trace(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.scenario_name, log.scenario_name);
        assert_eq!(loaded.commands.len(), 1);
        assert_eq!(loaded.reactions[0].label, "person");
    }
}
