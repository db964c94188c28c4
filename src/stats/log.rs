//! Running counters for coaching sessions.
//!
//! Counts what the engine did (frames, reps, warnings) so a user can see
//! cumulative activity with `fitwise-coach status`. Keypoints themselves are
//! never recorded.

use crate::core::arbiter::FeedbackKind;
use crate::core::session::Evaluation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current process, optionally persisted across runs.
#[derive(Debug)]
pub struct SessionLog {
    /// Frames evaluated against a known exercise
    frames_evaluated: AtomicU64,
    /// Frames rejected for missing landmarks or bad input
    frames_skipped: AtomicU64,
    /// Frames for an exercise id with no profile
    unknown_exercise_frames: AtomicU64,
    /// Reps counted
    reps_counted: AtomicU64,
    /// Frames whose shown message was a depth warning
    depth_warnings: AtomicU64,
    /// Frames whose shown message was a posture warning
    posture_warnings: AtomicU64,
    /// Process start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            frames_evaluated: AtomicU64::new(0),
            frames_skipped: AtomicU64::new(0),
            unknown_exercise_frames: AtomicU64::new(0),
            reps_counted: AtomicU64::new(0),
            depth_warnings: AtomicU64::new(0),
            posture_warnings: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads and saves its counters at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous session stats: {}", e);
        }

        log
    }

    /// Record the outcome of one evaluated frame.
    pub fn record_evaluation(&self, evaluation: &Evaluation, known_exercise: bool) {
        if !known_exercise {
            self.unknown_exercise_frames.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.frames_evaluated.fetch_add(1, Ordering::Relaxed);
        if evaluation.rep_completed {
            self.reps_counted.fetch_add(1, Ordering::Relaxed);
        }
        match evaluation.kind() {
            Some(FeedbackKind::DepthWarning) => {
                self.depth_warnings.fetch_add(1, Ordering::Relaxed);
            }
            Some(FeedbackKind::PostureWarning) => {
                self.posture_warnings.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Record a frame that could not be evaluated.
    pub fn record_skipped_frame(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record several skipped frames at once.
    pub fn record_skipped_frames(&self, count: u64) {
        self.frames_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_evaluated: self.frames_evaluated.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            unknown_exercise_frames: self.unknown_exercise_frames.load(Ordering::Relaxed),
            reps_counted: self.reps_counted.load(Ordering::Relaxed),
            depth_warnings: self.depth_warnings.load(Ordering::Relaxed),
            posture_warnings: self.posture_warnings.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Frames evaluated: {}\n\
             - Frames skipped: {}\n\
             - Unknown exercise frames: {}\n\
             - Reps counted: {}\n\
             - Depth warnings shown: {}\n\
             - Posture warnings shown: {}\n\
             - Session duration: {} seconds",
            stats.frames_evaluated,
            stats.frames_skipped,
            stats.unknown_exercise_frames,
            stats.reps_counted,
            stats.depth_warnings,
            stats.posture_warnings,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_evaluated: stats.frames_evaluated,
                frames_skipped: stats.frames_skipped,
                unknown_exercise_frames: stats.unknown_exercise_frames,
                reps_counted: stats.reps_counted,
                depth_warnings: stats.depth_warnings,
                posture_warnings: stats.posture_warnings,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats = serde_json::from_str(&content)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

                self.frames_evaluated
                    .store(persisted.frames_evaluated, Ordering::Relaxed);
                self.frames_skipped
                    .store(persisted.frames_skipped, Ordering::Relaxed);
                self.unknown_exercise_frames
                    .store(persisted.unknown_exercise_frames, Ordering::Relaxed);
                self.reps_counted
                    .store(persisted.reps_counted, Ordering::Relaxed);
                self.depth_warnings
                    .store(persisted.depth_warnings, Ordering::Relaxed);
                self.posture_warnings
                    .store(persisted.posture_warnings, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.frames_evaluated.store(0, Ordering::Relaxed);
        self.frames_skipped.store(0, Ordering::Relaxed);
        self.unknown_exercise_frames.store(0, Ordering::Relaxed);
        self.reps_counted.store(0, Ordering::Relaxed);
        self.depth_warnings.store(0, Ordering::Relaxed);
        self.posture_warnings.store(0, Ordering::Relaxed);
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of session statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub frames_evaluated: u64,
    pub frames_skipped: u64,
    pub unknown_exercise_frames: u64,
    pub reps_counted: u64,
    pub depth_warnings: u64,
    pub posture_warnings: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_evaluated: u64,
    frames_skipped: u64,
    #[serde(default)]
    unknown_exercise_frames: u64,
    reps_counted: u64,
    depth_warnings: u64,
    posture_warnings: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared session log.
pub type SharedSessionLog = Arc<SessionLog>;

/// Create a new shared session log.
pub fn create_shared_log() -> SharedSessionLog {
    Arc::new(SessionLog::new())
}

/// Create a new shared session log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedSessionLog {
    Arc::new(SessionLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arbiter::Feedback;
    use crate::core::rep::Stage;

    fn evaluation(rep_completed: bool, feedback: Option<Feedback>) -> Evaluation {
        Evaluation {
            exercise_id: "13".to_string(),
            count: 1,
            stage: Stage::Up,
            raw_angle: 170.0,
            angle: 170.0,
            rep_completed,
            feedback,
        }
    }

    #[test]
    fn test_session_log_counting() {
        let log = SessionLog::new();

        log.record_evaluation(&evaluation(true, Some(Feedback::depth("lower"))), true);
        log.record_evaluation(&evaluation(false, Some(Feedback::posture(40.0))), true);
        log.record_evaluation(&evaluation(false, None), false);
        log.record_skipped_frame();

        let stats = log.stats();
        assert_eq!(stats.frames_evaluated, 2);
        assert_eq!(stats.reps_counted, 1);
        assert_eq!(stats.depth_warnings, 1);
        assert_eq!(stats.posture_warnings, 1);
        assert_eq!(stats.unknown_exercise_frames, 1);
        assert_eq!(stats.frames_skipped, 1);
    }

    #[test]
    fn test_session_log_reset() {
        let log = SessionLog::new();
        log.record_skipped_frames(10);
        log.record_evaluation(&evaluation(true, None), true);
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.frames_skipped, 0);
        assert_eq!(stats.reps_counted, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("fitwise-stats-{}", uuid::Uuid::new_v4()))
            .join("stats.json");

        let log = SessionLog::with_persistence(path.clone());
        log.record_evaluation(&evaluation(true, None), true);
        log.save().unwrap();

        let reloaded = SessionLog::with_persistence(path.clone());
        assert_eq!(reloaded.stats().reps_counted, 1);
        assert_eq!(reloaded.stats().frames_evaluated, 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_summary_format() {
        let summary = SessionLog::new().summary();
        assert!(summary.contains("Frames evaluated"));
        assert!(summary.contains("Reps counted"));
        assert!(summary.contains("Posture warnings"));
    }
}
