//! Recording actuator: the simulated head.
//!
//! The sink publishes every commanded pose into a shared cell that the scene
//! reads when projecting targets, which closes the perception-action loop
//! without real hardware. All commands are also kept for offline analysis.

use control_core::error::ControlError;
use control_core::scheduler::ActuatorSink;
use control_core::types::{Clock, HeadPose};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Current head pose, shared between the actuator side (writer) and the
/// scene (reader).
#[derive(Clone, Default)]
pub struct SharedPose {
    inner: Arc<Mutex<HeadPose>>,
}

impl SharedPose {
    pub fn get(&self) -> HeadPose {
        match self.inner.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set(&self, pose: HeadPose) {
        match self.inner.lock() {
            Ok(mut guard) => *guard = pose,
            Err(poisoned) => *poisoned.into_inner() = pose,
        }
    }
}

/// One actuator command as seen by the simulated head.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Time of the command (s, simulation clock)
    pub time: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub body_yaw: f64,
}

/// Actuator sink that applies commands instantly to the shared pose and
/// records them all.
pub struct RecordingSink {
    shared: SharedPose,
    clock: Clock,
    pub commands: Vec<CommandRecord>,
    /// When set, fail every command from this index on (fault injection)
    pub fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn new(shared: SharedPose, clock: Clock) -> Self {
        Self {
            shared,
            clock,
            commands: Vec::new(),
            fail_after: None,
        }
    }
}

impl ActuatorSink for RecordingSink {
    fn set_target(&mut self, pose: &HeadPose) -> Result<(), ControlError> {
        if let Some(limit) = self.fail_after {
            if self.commands.len() >= limit {
                return Err(ControlError::Actuator("simulated servo fault".into()));
            }
        }
        self.shared.set(*pose);
        self.commands.push(CommandRecord {
            time: self.clock.now(),
            yaw: pose.yaw,
            pitch: pose.pitch,
            body_yaw: pose.body_yaw,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_publishes_commands_to_shared_pose() {
        let shared = SharedPose::default();
        let mut sink = RecordingSink::new(shared.clone(), Clock::new());
        let pose = HeadPose {
            yaw: 0.2,
            pitch: -0.1,
            body_yaw: 0.05,
        };
        sink.set_target(&pose).unwrap();
        assert_eq!(shared.get(), pose);
        assert_eq!(sink.commands.len(), 1);
    }

    #[test]
    fn fault_injection_fails_after_limit() {
        let mut sink = RecordingSink::new(SharedPose::default(), Clock::new());
        sink.fail_after = Some(2);
        assert!(sink.set_target(&HeadPose::NEUTRAL).is_ok());
        assert!(sink.set_target(&HeadPose::NEUTRAL).is_ok());
        assert!(sink.set_target(&HeadPose::NEUTRAL).is_err());
        assert_eq!(sink.commands.len(), 2);
    }
}
