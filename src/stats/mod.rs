//! Session statistics.
//!
//! Tracks how many frames were evaluated or skipped and how often each kind
//! of feedback was shown, for display and persistence across runs.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SessionLog, SessionStats,
    SharedSessionLog,
};
