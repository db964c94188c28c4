//! Pose input for the rep engine.
//!
//! Keypoint acquisition itself happens outside this crate. This module
//! defines the frame types the engine reads and a replay source that feeds
//! JSON Lines frames (from a file or a live estimator on stdin) over a channel.

pub mod replay;
pub mod types;

// Re-export commonly used types
pub use replay::{ReplayCollector, ReplayError};
pub use types::{FrameSize, Keypoint, PoseFrame, LANDMARK_COUNT};
