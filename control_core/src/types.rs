//! Fundamental types shared across the workspace.

use serde::{Deserialize, Serialize};
use std::time::Instant;

// ---------------------------------------------------------------------------
// Detections
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Center point of the box (pixels).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Box area (px²) — used as a "closest / most salient" proxy when picking
    /// among several candidates.
    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min).max(0.0) * (self.y_max - self.y_min).max(0.0)
    }
}

/// A detected object returned by the detection service, immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    /// Class label as reported by the service (matching is case-insensitive)
    pub label: String,
    /// Confidence score in [0, 1]
    pub score: f64,
    /// Bounding box in full-frame pixel coordinates
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn center(&self) -> (f64, f64) {
        self.bbox.center()
    }

    pub fn area(&self) -> f64 {
        self.bbox.area()
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Camera frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Frame center (pixels) — the zero-error point for tracking.
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// An encoded camera frame handed to the detection service. The payload is
/// opaque to the control core; capture timestamps travel alongside frames.
#[derive(Clone, Debug)]
pub struct Frame {
    pub size: FrameSize,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Poses
// ---------------------------------------------------------------------------

/// Joint-space target for the head, radians.
///
/// Sign conventions: positive yaw turns the head left, positive pitch tilts
/// it down (the idle-scan pitch bias "look slightly at the floor" is
/// positive), positive body yaw turns the torso left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
    pub body_yaw: f64,
}

impl HeadPose {
    /// All axes at zero.
    pub const NEUTRAL: HeadPose = HeadPose {
        yaw: 0.0,
        pitch: 0.0,
        body_yaw: 0.0,
    };
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic clock anchored at construction. All timestamps in the core are
/// f64 seconds from this epoch, so the pure logic can be tested with plain
/// numbers and a shared anchor keeps the detection and control threads on the
/// same timeline.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created.
    pub fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_center_and_area() {
        let b = BoundingBox::new(295.0, 215.0, 345.0, 265.0);
        assert_eq!(b.center(), (320.0, 240.0));
        assert_eq!(b.area(), 2500.0);
    }

    #[test]
    fn degenerate_bbox_has_zero_area() {
        let b = BoundingBox::new(10.0, 10.0, 5.0, 20.0);
        assert_eq!(b.area(), 0.0);
    }

    #[test]
    fn frame_center() {
        let f = FrameSize {
            width: 640,
            height: 480,
        };
        assert_eq!(f.center(), (320.0, 240.0));
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = Clock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
