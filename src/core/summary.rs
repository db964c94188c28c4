//! Workout summaries exported at the end of a tracking run.
//!
//! A [`SummaryBuilder`] is fed every [`Evaluation`] of a run and produces a
//! [`WorkoutSummary`] JSON document: reps achieved, how long the run lasted
//! by frame time, and how often each kind of feedback was shown.

use crate::core::arbiter::FeedbackKind;
use crate::core::profile::ExerciseProfile;
use crate::core::session::Evaluation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// The current summary format version.
pub const SUMMARY_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "fitwise-coach";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// How many evaluated frames showed each kind of feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCounts {
    pub rep_complete: u64,
    pub depth_warning: u64,
    pub posture_warning: u64,
}

impl FeedbackCounts {
    fn record(&mut self, kind: FeedbackKind) {
        match kind {
            FeedbackKind::RepComplete => self.rep_complete += 1,
            FeedbackKind::DepthWarning => self.depth_warning += 1,
            FeedbackKind::PostureWarning => self.posture_warning += 1,
        }
    }
}

/// Exported record of one tracking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub summary_version: String,
    pub summary_id: String,
    pub producer: Producer,
    pub exercise_id: String,
    pub exercise_name: String,
    /// Wall-clock start of the run (RFC3339)
    pub started_at_utc: String,
    /// Wall-clock time the summary was built (RFC3339)
    pub finished_at_utc: String,
    /// Span between first and last evaluated frame
    pub duration_secs: f64,
    pub frames_evaluated: u64,
    pub completed_reps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_reps: Option<u32>,
    /// Whether the target was reached (false without a target)
    pub completed: bool,
    pub feedback: FeedbackCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

/// Accumulates evaluations for one exercise run.
pub struct SummaryBuilder {
    instance_id: Uuid,
    started_at: DateTime<Utc>,
    target_reps: Option<u32>,
    first_frame: Option<Duration>,
    last_frame: Option<Duration>,
    frames: u64,
    count: u32,
    feedback: FeedbackCounts,
    last_message: Option<String>,
}

impl SummaryBuilder {
    /// Create a new builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            started_at: Utc::now(),
            target_reps: None,
            first_frame: None,
            last_frame: None,
            frames: 0,
            count: 0,
            feedback: FeedbackCounts::default(),
            last_message: None,
        }
    }

    /// Set the rep target the run is measured against.
    pub fn with_target_reps(mut self, target: u32) -> Self {
        self.target_reps = Some(target);
        self
    }

    /// Get the instance ID.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Record one evaluation taken at frame time `at`.
    pub fn record(&mut self, evaluation: &Evaluation, at: Duration) {
        self.first_frame.get_or_insert(at);
        self.last_frame = Some(at);
        self.frames += 1;
        self.count = self.count.max(evaluation.count);

        if let Some(ref feedback) = evaluation.feedback {
            self.feedback.record(feedback.kind);
            self.last_message = Some(feedback.message.clone());
        }
    }

    /// Build the summary for `profile`.
    pub fn build(&self, profile: &ExerciseProfile) -> WorkoutSummary {
        let duration = match (self.first_frame, self.last_frame) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => Duration::ZERO,
        };

        WorkoutSummary {
            summary_version: SUMMARY_VERSION.to_string(),
            summary_id: Uuid::new_v4().to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: self.instance_id.to_string(),
            },
            exercise_id: profile.id.clone(),
            exercise_name: profile.name.clone(),
            started_at_utc: self.started_at.to_rfc3339(),
            finished_at_utc: Utc::now().to_rfc3339(),
            duration_secs: duration.as_secs_f64(),
            frames_evaluated: self.frames,
            completed_reps: self.count,
            target_reps: self.target_reps,
            completed: self.target_reps.map_or(false, |t| self.count >= t),
            feedback: self.feedback.clone(),
            last_message: self.last_message.clone(),
        }
    }
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
