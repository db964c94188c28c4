//! Rep-detection and feedback engine.
//!
//! This module contains:
//! - Joint angle geometry and moving-average smoothing
//! - Exercise profiles and the up/down rep state machine
//! - Depth and posture advisors and the feedback arbiter
//! - The per-frame [`RepEngine`] and caller-owned [`Session`]
//! - Workout summaries for export

pub mod advisor;
pub mod arbiter;
pub mod geometry;
pub mod profile;
pub mod rep;
pub mod session;
pub mod smoothing;
pub mod summary;

// Re-export commonly used types
pub use advisor::{DepthTracker, PostureCheck};
pub use arbiter::{arbitrate, Feedback, FeedbackKind};
pub use geometry::{angle, JointTriplet};
pub use profile::{DepthPolicy, ExerciseProfile, ExerciseRegistry, RegistryError};
pub use rep::{RepEvent, RepState, Stage};
pub use session::{Evaluation, ExerciseState, FrameError, RepEngine, Session};
pub use smoothing::SmoothingWindow;
pub use summary::{SummaryBuilder, WorkoutSummary, PRODUCER_NAME, SUMMARY_VERSION};
