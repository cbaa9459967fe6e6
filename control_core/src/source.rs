//! Detection source: a background worker wrapping a slow, possibly remote
//! detection call, decoupled from the control cadence.
//!
//! # Contract
//! - `submit` is fire-and-forget: at most one request is in flight, later
//!   frames are dropped (bounds end-to-end latency, no queue growth under
//!   slow inference).
//! - `poll` never blocks beyond one slot-lock acquisition.
//! - A completed result older than the staleness ceiling is discarded
//!   entirely — an overly old detection would steer the head toward a
//!   position the target no longer occupies.
//! - Transient failures are retried with capped exponential backoff; any
//!   terminal failure degrades to "no detection this cycle" and the worker
//!   keeps going.

use crate::error::DetectError;
use crate::slot::DetectionSlot;
use crate::types::{Clock, Detection, Frame};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// External collaborators
// ---------------------------------------------------------------------------

/// The remote detection call. May block for hundreds of ms to seconds; only
/// ever invoked from the detection worker thread.
pub trait DetectionService: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError>;
}

/// Camera collaborator. `None` means no frame this cycle; the pump skips it.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Option<Frame>;
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Capped exponential backoff for transient service failures.
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// First wait after a transient failure (s)
    pub initial_wait_s: f64,
    /// Multiplicative wait growth per retry
    pub growth: f64,
    /// Ceiling on the wait between attempts (s)
    pub max_wait_s: f64,
    /// Retries after the initial attempt before giving up
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_wait_s: 5.0,
            growth: 1.5,
            max_wait_s: 30.0,
            max_retries: 12,
        }
    }
}

/// Detection-side configuration: what to look for and what to discard.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Label to track; matching is case-insensitive on trimmed labels
    pub target_label: String,
    /// Minimum confidence score for a candidate to survive filtering
    pub confidence_floor: f64,
    /// Max allowed `now − captured_at` for a completed result (s)
    pub staleness_ceiling_s: f64,
    pub backoff: BackoffConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            target_label: "person".into(),
            confidence_floor: 0.5,
            staleness_ceiling_s: 3.0,
            backoff: BackoffConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Keep candidates matching the target label at or above the confidence
/// floor, then pick the one with the largest bounding-box area.
pub fn select_target(
    candidates: Vec<Detection>,
    target_label: &str,
    confidence_floor: f64,
) -> Option<Detection> {
    let wanted = target_label.trim();
    candidates
        .into_iter()
        .filter(|d| d.label.trim().eq_ignore_ascii_case(wanted) && d.score >= confidence_floor)
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Run one detection, retrying transient failures with capped exponential
/// backoff. The wait is sliced so a stop request interrupts it promptly; an
/// interrupted retry surfaces the last transient error as terminal.
pub fn detect_with_backoff<S: DetectionService + ?Sized>(
    service: &mut S,
    frame: &Frame,
    backoff: &BackoffConfig,
    stop: &AtomicBool,
) -> Result<Vec<Detection>, DetectError> {
    let mut wait = backoff.initial_wait_s;
    let mut attempt = 0u32;
    loop {
        match service.detect(frame) {
            Ok(results) => return Ok(results),
            Err(err) if err.is_transient() && attempt < backoff.max_retries => {
                attempt += 1;
                debug!(attempt, wait_s = wait, "detection service warming up, backing off");
                if !sleep_interruptible(Duration::from_secs_f64(wait), stop) {
                    return Err(err);
                }
                wait = (wait * backoff.growth).min(backoff.max_wait_s);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Sleep in short slices, returning false as soon as `stop` is raised.
fn sleep_interruptible(duration: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    let slice = Duration::from_millis(50);
    while Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        thread::sleep(slice.min(deadline.saturating_duration_since(Instant::now())));
    }
    !stop.load(Ordering::Relaxed)
}

// ---------------------------------------------------------------------------
// DetectionSource
// ---------------------------------------------------------------------------

/// Handle to the background detection worker. Owns the shared slot; the
/// control loop only ever touches `poll` and `clear`.
pub struct DetectionSource {
    tx: Option<Sender<(Frame, f64)>>,
    slot: Arc<DetectionSlot>,
    clock: Clock,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DetectionSource {
    /// Spawn the worker thread around `service`.
    pub fn spawn<S>(config: SourceConfig, service: S, clock: Clock, stop: Arc<AtomicBool>) -> Self
    where
        S: DetectionService + 'static,
    {
        let slot = Arc::new(DetectionSlot::new());
        // Rendezvous channel: a try_send succeeds only while the worker is
        // parked in recv, which is exactly "at most one request in flight".
        let (tx, rx) = bounded::<(Frame, f64)>(0);
        let worker_slot = Arc::clone(&slot);
        let worker_stop = Arc::clone(&stop);
        let worker =
            thread::spawn(move || worker_loop(rx, service, config, worker_slot, clock, worker_stop));
        Self {
            tx: Some(tx),
            slot,
            clock,
            stop,
            worker: Some(worker),
        }
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Fire-and-forget submission. A no-op while a request is in flight:
    /// the frame is dropped, not queued.
    pub fn submit(&self, frame: Frame, captured_at: f64) {
        let Some(tx) = &self.tx else { return };
        match tx.try_send((frame, captured_at)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("detection in flight, dropping frame"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Latest completed result and its age in seconds (`+∞` when empty).
    /// Age is measured from the producing frame's capture time, so network
    /// latency never counts as freshness.
    pub fn poll(&self) -> (Option<Detection>, f64) {
        let (detection, captured_at) = self.slot.read();
        let age = captured_at
            .map(|t| self.clock.now() - t)
            .unwrap_or(f64::INFINITY);
        (detection, age)
    }

    /// Drop the cached detection (TRACKING → SCANNING transition).
    pub fn clear(&self) {
        self.slot.clear();
    }

    /// Block until the worker has exited (test helper; normal shutdown just
    /// drops the handle and abandons in-flight work).
    pub fn join(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for DetectionSource {
    fn drop(&mut self) {
        // Cooperative: raise stop and detach. In-flight requests are
        // abandoned, not awaited.
        self.stop.store(true, Ordering::Relaxed);
        self.tx.take();
        self.worker.take();
    }
}

fn worker_loop<S: DetectionService>(
    rx: Receiver<(Frame, f64)>,
    mut service: S,
    config: SourceConfig,
    slot: Arc<DetectionSlot>,
    clock: Clock,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        let (frame, captured_at) = match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => job,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let candidates = match detect_with_backoff(&mut service, &frame, &config.backoff, &stop) {
            Ok(candidates) => candidates,
            Err(err) => {
                // Degrades to "no detection this cycle"; the cached value in
                // the slot keeps aging out on its own.
                warn!(%err, "detection call failed");
                continue;
            }
        };

        let age = clock.now() - captured_at;
        if age > config.staleness_ceiling_s {
            debug!(age_s = age, "discarding stale detection result");
            continue;
        }

        let best = select_target(candidates, &config.target_label, config.confidence_floor);
        if !slot.store(best, captured_at) {
            debug!("discarding out-of-order detection result");
        }
    }
}

// ---------------------------------------------------------------------------
// Capture pump
// ---------------------------------------------------------------------------

/// Capture frames at `detection_hz` and hand them to the source. A cycle
/// with no frame from the camera is skipped entirely. Returns when `stop`
/// is raised.
pub fn run_capture_pump<F: FrameSource>(
    frames: &mut F,
    source: &DetectionSource,
    detection_hz: f64,
    stop: &AtomicBool,
) {
    let period = Duration::from_secs_f64(1.0 / detection_hz.max(0.1));
    let clock = source.clock();
    while !stop.load(Ordering::Relaxed) {
        let started = Instant::now();
        match frames.capture() {
            Some(frame) => source.submit(frame, clock.now()),
            None => debug!("no frame available, skipping detection cycle"),
        }
        let elapsed = started.elapsed();
        if elapsed < period {
            thread::sleep(period - elapsed);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
