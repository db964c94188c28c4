//! FitWise Coach - exercise repetition counting and form feedback.
//!
//! This library turns a stream of 2D body keypoints (33 MediaPipe-style
//! landmarks per frame) into a running repetition count and one coaching
//! message per frame.
//!
//! # How it works
//!
//! - **Angles**: the exercise's joint angle is computed in pixel space and
//!   smoothed over the last few frames
//! - **Reps**: a two-stage state machine with hysteresis and a cooldown
//!   counts one rep per down/up cycle
//! - **Feedback**: depth and posture checks run alongside, and a priority
//!   arbiter picks the single message to show
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        FitWise Coach                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Replay    │──▶│  RepEngine  │──▶│   Arbiter   │──▶ msg  │
//! │  │ (JSONL/HTTP)│   │ angle+smooth│   │ posture >   │         │
//! │  └─────────────┘   │ + rep state │   │ depth > rep │         │
//! │                    └─────────────┘   └─────────────┘         │
//! │                           │                 │                │
//! │                           ▼                 ▼                │
//! │                    ┌─────────────┐   ┌─────────────┐         │
//! │                    │   Session   │   │   Workout   │         │
//! │                    │    Stats    │   │   Summary   │         │
//! │                    └─────────────┘   └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fitwise_coach::{FrameSize, RepEngine, ReplayCollector, Session};
//!
//! let engine = RepEngine::with_defaults();
//! let mut session = Session::new();
//!
//! let mut replay = ReplayCollector::stdin();
//! replay.start().expect("Failed to start replay");
//!
//! for frame in replay.receiver().iter() {
//!     if let Ok(eval) = engine.evaluate_frame(&mut session, "squat", &frame, FrameSize::default()) {
//!         println!("{} {:?}", eval.count, eval.message());
//!     }
//! }
//! ```

pub mod config;
pub mod core;
pub mod pose;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{CoachingConfig, Config, ConfigError};
pub use core::{
    Evaluation, ExerciseProfile, ExerciseRegistry, Feedback, FeedbackKind, FrameError, RepEngine,
    Session, Stage, SummaryBuilder, WorkoutSummary,
};
pub use pose::{FrameSize, Keypoint, PoseFrame, ReplayCollector, ReplayError};
pub use stats::{SessionLog, SessionStats, SharedSessionLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Usage notes shown by `fitwise-coach about`.
pub const COACHING_NOTES: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                  FITWISE COACH - HOW IT COACHES                  ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Built-in exercises:                                             ║
║    • push_up (id 13): left shoulder-elbow-wrist angle            ║
║    • squat   (id 3):  left hip-knee-ankle angle                  ║
║                                                                  ║
║  One message per frame, most important first:                    ║
║    1. Straighten your back! (shoulder-hip-knee off by > 30°)     ║
║    2. Depth reminders (go lower)                                 ║
║    3. Rep N complete!                                            ║
║                                                                  ║
║  Keypoints are processed in memory and never stored.             ║
║  Only counters and end-of-run summaries are written to disk.     ║
║                                                                  ║
║  View cumulative statistics anytime with:                        ║
║    fitwise-coach status                                          ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coaching_notes_contents() {
        assert!(COACHING_NOTES.contains("push_up"));
        assert!(COACHING_NOTES.contains("Straighten your back!"));
        assert!(COACHING_NOTES.contains("never stored"));
    }
}
