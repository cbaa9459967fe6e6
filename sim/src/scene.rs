//! Simulated scene: world-space targets viewed through a pinhole camera that
//! rides on the commanded head pose.
//!
//! World frame: x forward, y left, z up, meters, camera at the origin.
//! Positive yaw turns the camera left (about +z), positive pitch tilts it
//! down (about +y). A target left of the optical axis therefore lands left
//! of the frame center, which is what the yaw controller expects.
//!
//! The scene plays both collaborator roles at once:
//! - [`SceneCamera`] is the frame source feeding the capture pump
//! - [`SceneDetector`] is the detection service, with configurable latency,
//!   warm-up failures, misses and pixel noise

use crate::recorder::SharedPose;
use control_core::error::DetectError;
use control_core::source::{DetectionService, FrameSource};
use control_core::types::{BoundingBox, Clock, Detection, Frame, FrameSize, HeadPose};
use nalgebra::{Rotation3, Vector3};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Camera and detector emulation parameters.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub frame: FrameSize,
    /// Horizontal field of view (radians); square pixels
    pub horizontal_fov: f64,
    /// Probability that a visible target is missed on one call
    pub miss_probability: f64,
    /// Probability that the camera yields no frame on one capture
    pub frame_drop_probability: f64,
    /// Uniform jitter applied to the projected box center (px)
    pub center_noise_px: f64,
    /// Blocking time per detection call
    pub detect_latency: Duration,
    /// Calls that fail with a transient error before the first success
    pub warmup_failures: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            frame: FrameSize::default(),
            horizontal_fov: 62.0_f64.to_radians(),
            miss_probability: 0.05,
            frame_drop_probability: 0.0,
            center_noise_px: 2.0,
            detect_latency: Duration::from_millis(80),
            warmup_failures: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// How a world target moves over simulation time.
#[derive(Clone, Debug)]
pub enum TargetMotion {
    Stationary,
    /// Sinusoidal displacement along world y (lateral walk)
    LateralSweep { amplitude_m: f64, period_s: f64 },
}

/// One object in the world. Anything outside its presence window simply does
/// not exist for the detector.
#[derive(Clone, Debug)]
pub struct WorldTarget {
    pub label: String,
    pub score: f64,
    /// Base position [x, y, z] in meters
    pub base: [f64; 3],
    pub motion: TargetMotion,
    pub appear_at: f64,
    pub disappear_at: f64,
    pub width_m: f64,
    pub height_m: f64,
}

impl WorldTarget {
    /// A person-sized target, present for the whole run.
    pub fn person(base: [f64; 3]) -> Self {
        Self {
            label: "person".into(),
            score: 0.9,
            base,
            motion: TargetMotion::Stationary,
            appear_at: 0.0,
            disappear_at: f64::INFINITY,
            width_m: 0.5,
            height_m: 1.7,
        }
    }

    pub fn is_present(&self, now: f64) -> bool {
        now >= self.appear_at && now < self.disappear_at
    }

    pub fn position_at(&self, now: f64) -> Vector3<f64> {
        let base = Vector3::new(self.base[0], self.base[1], self.base[2]);
        match self.motion {
            TargetMotion::Stationary => base,
            TargetMotion::LateralSweep {
                amplitude_m,
                period_s,
            } => base + Vector3::new(0.0, amplitude_m * (TAU * now / period_s).sin(), 0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Scene core
// ---------------------------------------------------------------------------

struct SceneCore {
    config: SceneConfig,
    targets: Vec<WorldTarget>,
    pose: SharedPose,
    clock: Clock,
}

impl SceneCore {
    fn focal_px(&self) -> f64 {
        (self.config.frame.width as f64 / 2.0) / (self.config.horizontal_fov / 2.0).tan()
    }

    /// Project a world point through the current head orientation. Returns
    /// pixel coordinates and depth, or None when the point is behind the
    /// image plane.
    fn project(&self, pose: &HeadPose, point: &Vector3<f64>) -> Option<(f64, f64, f64)> {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), pose.yaw + pose.body_yaw)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), pose.pitch);
        let cam = rotation.inverse_transform_vector(point);
        if cam.x < 0.1 {
            return None;
        }
        let f = self.focal_px();
        let (cx, cy) = self.config.frame.center();
        let u = cx - f * (cam.y / cam.x);
        let v = cy - f * (cam.z / cam.x);
        Some((u, v, cam.x))
    }

    /// All detector-visible targets at `now`, with noise and misses applied.
    fn detections_at(&self, now: f64, pose: &HeadPose, rng: &mut ChaCha8Rng) -> Vec<Detection> {
        let f = self.focal_px();
        let width = self.config.frame.width as f64;
        let height = self.config.frame.height as f64;
        let mut out = Vec::new();

        for target in &self.targets {
            if !target.is_present(now) {
                continue;
            }
            let Some((u, v, depth)) = self.project(pose, &target.position_at(now)) else {
                continue;
            };
            if rng.gen::<f64>() < self.config.miss_probability {
                continue;
            }

            let noise = self.config.center_noise_px;
            let u = u + rng.gen::<f64>() * 2.0 * noise - noise;
            let v = v + rng.gen::<f64>() * 2.0 * noise - noise;
            let half_w = f * (target.width_m / 2.0) / depth;
            let half_h = f * (target.height_m / 2.0) / depth;
            let bbox = BoundingBox::new(u - half_w, v - half_h, u + half_w, v + half_h);
            if bbox.x_max < 0.0 || bbox.x_min > width || bbox.y_max < 0.0 || bbox.y_min > height {
                continue;
            }

            out.push(Detection {
                label: target.label.clone(),
                score: target.score,
                bbox,
            });
        }
        out
    }
}

/// The assembled scene. `split` yields the two collaborator handles; both
/// read the same shared state so detections always reflect the latest
/// commanded pose.
pub struct SimulatedScene {
    core: Arc<SceneCore>,
    seed: u64,
}

impl SimulatedScene {
    pub fn new(
        config: SceneConfig,
        targets: Vec<WorldTarget>,
        pose: SharedPose,
        clock: Clock,
        seed: u64,
    ) -> Self {
        Self {
            core: Arc::new(SceneCore {
                config,
                targets,
                pose,
                clock,
            }),
            seed,
        }
    }

    pub fn split(self) -> (SceneCamera, SceneDetector) {
        let warmup = self.core.config.warmup_failures;
        (
            SceneCamera {
                core: Arc::clone(&self.core),
                rng: ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(1)),
            },
            SceneDetector {
                core: self.core,
                rng: ChaCha8Rng::seed_from_u64(self.seed),
                warmup_remaining: warmup,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Collaborator handles
// ---------------------------------------------------------------------------

pub struct SceneCamera {
    core: Arc<SceneCore>,
    rng: ChaCha8Rng,
}

impl FrameSource for SceneCamera {
    fn capture(&mut self) -> Option<Frame> {
        if self.rng.gen::<f64>() < self.core.config.frame_drop_probability {
            return None;
        }
        Some(Frame {
            size: self.core.config.frame,
            data: Vec::new(),
        })
    }
}

pub struct SceneDetector {
    core: Arc<SceneCore>,
    rng: ChaCha8Rng,
    warmup_remaining: u32,
}

impl DetectionService for SceneDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return Err(DetectError::NotReady("model loading".into()));
        }
        if !self.core.config.detect_latency.is_zero() {
            thread::sleep(self.core.config.detect_latency);
        }
        let now = self.core.clock.now();
        let pose = self.core.pose.get();
        Ok(self.core.detections_at(now, &pose, &mut self.rng))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
