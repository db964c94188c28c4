//! Pose keypoint types consumed by the rep engine.
//!
//! Keypoints arrive once per frame from an external pose estimator. The
//! engine only reads them; it never stores a frame beyond one evaluation.

use serde::{Deserialize, Serialize};

/// Number of landmarks in the MediaPipe Pose topology.
pub const LANDMARK_COUNT: usize = 33;

pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

/// A single tracked landmark in normalized image coordinates (0-1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Relative depth, when the estimator provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// Visibility / confidence score (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Keypoint {
    /// Create a keypoint from normalized coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: None,
        }
    }

    /// Attach a visibility score.
    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Project into pixel space for the given frame.
    pub fn to_pixels(&self, frame: FrameSize) -> (f64, f64) {
        (self.x * frame.width as f64, self.y * frame.height as f64)
    }
}

/// Frame dimensions in pixels, used to denormalize keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
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

/// One frame of pose data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Monotonic timestamp in milliseconds since tracking started
    pub timestamp_ms: u64,
    /// Keypoints indexed by landmark id
    pub keypoints: Vec<Keypoint>,
}

impl PoseFrame {
    pub fn new(timestamp_ms: u64, keypoints: Vec<Keypoint>) -> Self {
        Self {
            timestamp_ms,
            keypoints,
        }
    }

    /// Frame timestamp as a duration since tracking started.
    pub fn timestamp(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timestamp_ms)
    }

    /// Check whether every landmark index in `indices` is present.
    pub fn has_landmarks(&self, indices: &[usize]) -> bool {
        indices.iter().all(|&i| i < self.keypoints.len())
    }
}
