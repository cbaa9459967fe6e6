//! Error taxonomy: transient vs. hard detection failures, actuator failures.
//!
//! No detection error may ever stop the control loop — they degrade to
//! "no detection this cycle". Only an actuator failure (or an explicit stop
//! request) terminates the loop.

use thiserror::Error;

/// Failure of one remote detection call.
#[derive(Clone, Debug, Error)]
pub enum DetectError {
    /// Transient condition (service scaling up from zero, model still
    /// loading). Retried with capped exponential backoff.
    #[error("detection service not ready: {0}")]
    NotReady(String),
    /// Hard failure (auth, malformed request, protocol error). Not retried;
    /// the cycle is treated as "no detection".
    #[error("detection request failed: {0}")]
    Request(String),
}

impl DetectError {
    /// Whether the caller should retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, DetectError::NotReady(_))
    }
}

/// Errors that terminate the control loop.
#[derive(Clone, Debug, Error)]
pub enum ControlError {
    /// The actuator sink rejected a command in a non-recoverable way.
    #[error("actuator sink failure: {0}")]
    Actuator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_ready_is_transient() {
        assert!(DetectError::NotReady("scaling".into()).is_transient());
        assert!(!DetectError::Request("401".into()).is_transient());
    }
}
