//! Per-frame evaluation and the caller-owned session state it mutates.
//!
//! A [`Session`] holds the rep, smoothing and depth state of every exercise
//! tracked so far, keyed by profile id. The [`RepEngine`] is stateless
//! apart from its read-only registry and tuning, so one engine can serve
//! many independent sessions. Callers serialize access per session by
//! handing in `&mut Session`.

use crate::config::CoachingConfig;
use crate::core::advisor::{DepthTracker, PostureCheck};
use crate::core::arbiter::{arbitrate, Feedback, FeedbackKind};
use crate::core::profile::{ExerciseProfile, ExerciseRegistry};
use crate::core::rep::{RepState, Stage};
use crate::core::smoothing::SmoothingWindow;
use crate::pose::types::{FrameSize, Keypoint, PoseFrame};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Tracking state for one exercise within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseState {
    rep: RepState,
    window: SmoothingWindow,
    depth: DepthTracker,
}

impl ExerciseState {
    pub fn new(smoothing_window: usize) -> Self {
        Self {
            rep: RepState::new(),
            window: SmoothingWindow::new(smoothing_window),
            depth: DepthTracker::new(),
        }
    }

    pub fn rep(&self) -> &RepState {
        &self.rep
    }

    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }

    pub fn depth(&self) -> &DepthTracker {
        &self.depth
    }
}

/// All per-exercise state of one tracking session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    exercises: HashMap<String, ExerciseState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for an exercise id, if it has been evaluated in this session.
    pub fn exercise(&self, exercise_id: &str) -> Option<&ExerciseState> {
        self.exercises.get(exercise_id)
    }

    /// Current rep count for an exercise id (0 if never evaluated).
    pub fn count(&self, exercise_id: &str) -> u32 {
        self.exercises
            .get(exercise_id)
            .map_or(0, |state| state.rep.count())
    }

    /// Ids of all exercises with state in this session.
    pub fn exercise_ids(&self) -> impl Iterator<Item = &str> {
        self.exercises.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Drop all state, as on an exercise change or tracking restart.
    pub fn reset(&mut self) {
        self.exercises.clear();
    }
}

/// Result of evaluating one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Profile id the frame was evaluated against (or the unknown id as given)
    pub exercise_id: String,
    /// Rep count after this frame
    pub count: u32,
    /// Stage after this frame
    pub stage: Stage,
    /// Unsmoothed joint angle in degrees
    pub raw_angle: f64,
    /// Smoothed joint angle in degrees
    pub angle: f64,
    /// Whether this frame completed a rep
    pub rep_completed: bool,
    /// The message to show, after arbitration
    pub feedback: Option<Feedback>,
}

impl Evaluation {
    /// Result for a frame that could not be attributed to any exercise.
    pub fn neutral(exercise_id: &str) -> Self {
        Self {
            exercise_id: exercise_id.to_string(),
            count: 0,
            stage: Stage::Up,
            raw_angle: 0.0,
            angle: 0.0,
            rep_completed: false,
            feedback: None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.feedback.as_ref().map(|f| f.message.as_str())
    }

    pub fn kind(&self) -> Option<FeedbackKind> {
        self.feedback.as_ref().map(|f| f.kind)
    }

    /// The `(count, message)` pair streamed to clients.
    pub fn into_pair(self) -> (u32, Option<String>) {
        (self.count, self.feedback.map(|f| f.message))
    }
}

/// A frame that cannot be evaluated. Session state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    MissingLandmark { index: usize, available: usize },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::MissingLandmark { index, available } => write!(
                f,
                "Frame is missing landmark {index} (only {available} keypoints)"
            ),
        }
    }
}

impl std::error::Error for FrameError {}

/// Turns pose frames into rep counts and coaching feedback.
#[derive(Debug, Clone)]
pub struct RepEngine {
    registry: ExerciseRegistry,
    config: CoachingConfig,
    posture: PostureCheck,
}

impl RepEngine {
    pub fn new(registry: ExerciseRegistry, config: CoachingConfig) -> Self {
        let posture = config.posture_check();
        Self {
            registry,
            config,
            posture,
        }
    }

    /// Engine with the built-in profiles and default tuning.
    pub fn with_defaults() -> Self {
        Self::new(ExerciseRegistry::builtin(), CoachingConfig::default())
    }

    pub fn registry(&self) -> &ExerciseRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CoachingConfig {
        &self.config
    }

    /// Evaluate one frame for `exercise_id` at monotonic time `now`.
    ///
    /// An unknown exercise id yields [`Evaluation::neutral`] and leaves the
    /// session untouched. A frame missing a required landmark is rejected
    /// before any state changes.
    pub fn evaluate(
        &self,
        session: &mut Session,
        exercise_id: &str,
        keypoints: &[Keypoint],
        frame: FrameSize,
        now: Duration,
    ) -> Result<Evaluation, FrameError> {
        let profile = match self.registry.resolve(exercise_id) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::debug!("{}", e);
                return Ok(Evaluation::neutral(exercise_id));
            }
        };

        self.ensure_landmarks(profile, keypoints)?;

        let raw_angle = profile
            .triplet
            .angle_in(keypoints, frame)
            .ok_or(FrameError::MissingLandmark {
                index: profile.triplet.vertex,
                available: keypoints.len(),
            })?;
        let posture_warning = self.posture.check(keypoints, frame);

        let state = session
            .exercises
            .entry(profile.id.clone())
            .or_insert_with(|| ExerciseState::new(self.config.smoothing_window));

        let angle = state.window.smooth(raw_angle);
        let rep_event = state.rep.update(angle, profile, now);
        let depth_warning = state.depth.check(
            angle,
            state.rep.stage(),
            profile,
            self.config.depth_check_period,
            now,
        );

        let candidates = rep_event
            .map(|event| Feedback::rep_complete(event.count))
            .into_iter()
            .chain(depth_warning)
            .chain(posture_warning);
        let feedback = arbitrate(candidates);

        if let Some(ref fb) = feedback {
            tracing::trace!(exercise = %profile.id, kind = fb.kind.as_str(), "{}", fb.message);
        }

        Ok(Evaluation {
            exercise_id: profile.id.clone(),
            count: state.rep.count(),
            stage: state.rep.stage(),
            raw_angle,
            angle,
            rep_completed: rep_event.is_some(),
            feedback,
        })
    }

    /// Evaluate a [`PoseFrame`] using its own timestamp.
    pub fn evaluate_frame(
        &self,
        session: &mut Session,
        exercise_id: &str,
        pose: &PoseFrame,
        frame: FrameSize,
    ) -> Result<Evaluation, FrameError> {
        self.evaluate(session, exercise_id, &pose.keypoints, frame, pose.timestamp())
    }

    fn ensure_landmarks(
        &self,
        profile: &ExerciseProfile,
        keypoints: &[Keypoint],
    ) -> Result<(), FrameError> {
        let required = profile
            .triplet
            .indices()
            .into_iter()
            .chain(self.posture.triplet.indices());

        for index in required {
            if index >= keypoints.len() {
                return Err(FrameError::MissingLandmark {
                    index,
                    available: keypoints.len(),
                });
            }
        }
        Ok(())
    }
}

impl Default for RepEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profile::{PUSH_UP_ID, SQUAT_ID};
    use crate::pose::types::LANDMARK_COUNT;

    fn upright() -> Vec<Keypoint> {
        // Everything on one vertical line: straight back, straight legs and arms.
        (0..LANDMARK_COUNT)
            .map(|i| Keypoint::new(0.5, i as f64 / LANDMARK_COUNT as f64))
            .collect()
    }

    #[test]
    fn test_unknown_exercise_is_neutral() {
        let engine = RepEngine::with_defaults();
        let mut session = Session::new();

        let eval = engine
            .evaluate(&mut session, "unknown-id", &upright(), FrameSize::default(), Duration::ZERO)
            .unwrap();

        assert_eq!(eval.clone().into_pair(), (0, None));
        assert_eq!(eval.exercise_id, "unknown-id");
        assert!(session.is_empty());
    }

    #[test]
    fn test_missing_landmark_leaves_session_untouched() {
        let engine = RepEngine::with_defaults();
        let mut session = Session::new();
        let short = vec![Keypoint::new(0.5, 0.5); 20];

        let err = engine
            .evaluate(&mut session, PUSH_UP_ID, &short, FrameSize::default(), Duration::ZERO)
            .unwrap_err();

        assert_eq!(
            err,
            FrameError::MissingLandmark {
                index: 23,
                available: 20
            }
        );
        assert!(session.is_empty());
    }

    #[test]
    fn test_state_keyed_by_profile_id() {
        let engine = RepEngine::with_defaults();
        let mut session = Session::new();

        let eval = engine
            .evaluate(&mut session, "squat", &upright(), FrameSize::default(), Duration::ZERO)
            .unwrap();

        assert_eq!(eval.exercise_id, SQUAT_ID);
        assert!(session.exercise(SQUAT_ID).is_some());
        assert!(session.exercise("squat").is_none());
        assert_eq!(session.exercise(SQUAT_ID).unwrap().window().len(), 1);
    }

    #[test]
    fn test_upright_frame_angles() {
        let engine = RepEngine::with_defaults();
        let mut session = Session::new();

        let eval = engine
            .evaluate(&mut session, SQUAT_ID, &upright(), FrameSize::default(), Duration::ZERO)
            .unwrap();

        assert!((eval.raw_angle - 180.0).abs() < 1e-6);
        assert_eq!(eval.stage, Stage::Up);
        assert_eq!(eval.count, 0);
        // First frame opens the depth period; posture is straight.
        assert_eq!(eval.feedback, None);
    }

    #[test]
    fn test_reset_clears_all_exercises() {
        let engine = RepEngine::with_defaults();
        let mut session = Session::new();
        for id in [PUSH_UP_ID, SQUAT_ID] {
            engine
                .evaluate(&mut session, id, &upright(), FrameSize::default(), Duration::ZERO)
                .unwrap();
        }
        assert_eq!(session.exercise_ids().count(), 2);

        session.reset();
        assert!(session.is_empty());
        assert_eq!(session.count(SQUAT_ID), 0);
    }
}
