//! The shared slot connecting the detection thread to the control loop.
//!
//! This is the only shared mutable state between the two cadences. The lock
//! is held only for the duration of a read or write, never across a network
//! call, so the control loop's worst-case blocking time is one short lock
//! acquisition.

use crate::types::Detection;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct SlotState {
    detection: Option<Detection>,
    /// Capture time of the *frame* that produced `detection` — never the
    /// time the result arrived (latency must not count as freshness).
    captured_at: Option<f64>,
}

/// Single-value exchange between the detection worker and the control loop.
#[derive(Debug, Default)]
pub struct DetectionSlot {
    inner: Mutex<SlotState>,
}

impl DetectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writers only ever hold the lock for a field assignment, so a poisoned
    /// state is still consistent and the slot keeps working.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store one completed result (possibly "no detection") together with the
    /// capture time of the frame it came from.
    ///
    /// Returns false and leaves the slot untouched when `captured_at` is older
    /// than the cached capture time: a late completion from an earlier frame
    /// must not overwrite a newer result.
    pub fn store(&self, detection: Option<Detection>, captured_at: f64) -> bool {
        let mut state = self.lock();
        if let Some(cached) = state.captured_at {
            if captured_at < cached {
                return false;
            }
        }
        state.detection = detection;
        state.captured_at = Some(captured_at);
        true
    }

    /// Non-blocking read of the cached value and its frame capture time.
    pub fn read(&self) -> (Option<Detection>, Option<f64>) {
        let state = self.lock();
        (state.detection.clone(), state.captured_at)
    }

    /// Drop the cached value (used on the TRACKING → SCANNING transition).
    pub fn clear(&self) {
        let mut state = self.lock();
        state.detection = None;
        state.captured_at = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
