//! Depth and posture checks that produce corrective feedback.
//!
//! Depth feedback depends on the exercise's [`DepthPolicy`]. Squats keep a
//! running minimum of the knee angle and are judged once per depth period;
//! push-ups are judged on every frame at the top of the motion. Posture is
//! checked identically for every exercise from a separate, unsmoothed angle.

use crate::core::arbiter::Feedback;
use crate::core::geometry::JointTriplet;
use crate::core::profile::{DepthPolicy, ExerciseProfile};
use crate::core::rep::Stage;
use crate::pose::types::{FrameSize, Keypoint, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER};
use std::time::Duration;

/// Message for a depth period with no sufficiently deep rep.
pub const PERIODIC_DEPTH_MESSAGE: &str = "Make sure to go deeper into your squat!";

/// Message for the per-frame depth check.
pub const IMMEDIATE_DEPTH_MESSAGE: &str = "Try going lower on your push-ups!";

/// Default length of a periodic depth window.
pub const DEFAULT_DEPTH_PERIOD: Duration = Duration::from_secs(5);

/// Default posture triplet: left shoulder, left hip, left knee.
pub const DEFAULT_POSTURE_TRIPLET: JointTriplet =
    JointTriplet::new(LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE);

/// Default allowed deviation from a straight back, in degrees.
pub const DEFAULT_POSTURE_TOLERANCE: f64 = 30.0;

/// Windowed depth state for one exercise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthTracker {
    /// Deepest (smallest) angle seen while down; `None` means no data yet.
    min_angle_seen: Option<f64>,
    /// Start of the current depth period.
    last_check_time: Option<Duration>,
}

impl DepthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_angle_seen(&self) -> Option<f64> {
        self.min_angle_seen
    }

    pub fn last_check_time(&self) -> Option<Duration> {
        self.last_check_time
    }

    /// Run the depth check for one frame.
    ///
    /// `stage` is the stage after this frame's state-machine update.
    pub fn check(
        &mut self,
        angle: f64,
        stage: Stage,
        profile: &ExerciseProfile,
        period: Duration,
        now: Duration,
    ) -> Option<Feedback> {
        match profile.depth_policy {
            DepthPolicy::Periodic { margin } => {
                self.check_periodic(angle, stage, profile.down_threshold + margin, period, now)
            }
            DepthPolicy::Immediate { margin } => {
                if stage == Stage::Up && angle > profile.down_threshold + margin {
                    Some(Feedback::depth(IMMEDIATE_DEPTH_MESSAGE))
                } else {
                    None
                }
            }
            DepthPolicy::Disabled => None,
        }
    }

    fn check_periodic(
        &mut self,
        angle: f64,
        stage: Stage,
        limit: f64,
        period: Duration,
        now: Duration,
    ) -> Option<Feedback> {
        let period_start = *self.last_check_time.get_or_insert(now);

        if stage == Stage::Down {
            self.min_angle_seen = Some(self.min_angle_seen.map_or(angle, |m| m.min(angle)));
            return None;
        }

        if now.saturating_sub(period_start) <= period {
            return None;
        }

        self.last_check_time = Some(now);
        // No data counts as not deep enough.
        let insufficient = self.min_angle_seen.map_or(true, |m| m > limit);
        self.min_angle_seen = None;

        if insufficient {
            tracing::debug!(limit, "depth period without a deep enough rep");
            Some(Feedback::depth(PERIODIC_DEPTH_MESSAGE))
        } else {
            None
        }
    }
}

/// Posture check parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureCheck {
    pub triplet: JointTriplet,
    /// Allowed deviation from 180° before warning
    pub tolerance: f64,
}

impl PostureCheck {
    /// Deviation of the posture angle from a straight line, if all landmarks exist.
    pub fn deviation(&self, keypoints: &[Keypoint], frame: FrameSize) -> Option<f64> {
        self.triplet
            .angle_in(keypoints, frame)
            .map(|angle| (180.0 - angle).abs())
    }

    /// Warn when the deviation exceeds the tolerance.
    pub fn check(&self, keypoints: &[Keypoint], frame: FrameSize) -> Option<Feedback> {
        let deviation = self.deviation(keypoints, frame)?;
        if deviation > self.tolerance {
            Some(Feedback::posture(deviation))
        } else {
            None
        }
    }
}

impl Default for PostureCheck {
    fn default() -> Self {
        Self {
            triplet: DEFAULT_POSTURE_TRIPLET,
            tolerance: DEFAULT_POSTURE_TOLERANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arbiter::FeedbackKind;
    use crate::pose::types::LANDMARK_COUNT;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_periodic_tracks_minimum_while_down() {
        let profile = ExerciseProfile::squat();
        let mut tracker = DepthTracker::new();

        for angle in [95.0, 80.0, 90.0] {
            assert!(tracker
                .check(angle, Stage::Down, &profile, DEFAULT_DEPTH_PERIOD, secs(1.0))
                .is_none());
        }
        assert_eq!(tracker.min_angle_seen(), Some(80.0));
    }

    #[test]
    fn test_periodic_sufficient_depth_resets_silently() {
        let profile = ExerciseProfile::squat();
        let mut tracker = DepthTracker::new();

        tracker.check(170.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, secs(0.0));
        tracker.check(90.0, Stage::Down, &profile, DEFAULT_DEPTH_PERIOD, secs(2.0));
        let result = tracker.check(170.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, secs(5.5));

        assert!(result.is_none());
        assert_eq!(tracker.min_angle_seen(), None);
        assert_eq!(tracker.last_check_time(), Some(secs(5.5)));
    }

    #[test]
    fn test_periodic_warns_once_per_period() {
        let profile = ExerciseProfile::squat();
        let mut tracker = DepthTracker::new();
        let mut warnings = 0;

        // Standing for 11 seconds at 10 fps, never going down.
        for i in 0..=110 {
            let now = Duration::from_millis(i * 100);
            if let Some(fb) = tracker.check(170.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, now) {
                assert_eq!(fb.kind, FeedbackKind::DepthWarning);
                assert_eq!(fb.message, PERIODIC_DEPTH_MESSAGE);
                warnings += 1;
            }
        }
        // Fires at 5.1s and 10.2s.
        assert_eq!(warnings, 2);
    }

    #[test]
    fn test_periodic_shallow_minimum_warns() {
        let profile = ExerciseProfile::squat();
        let mut tracker = DepthTracker::new();

        tracker.check(170.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, secs(0.0));
        // limit is 97 + 15 = 112
        tracker.check(113.0, Stage::Down, &profile, DEFAULT_DEPTH_PERIOD, secs(1.0));
        let result = tracker.check(170.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, secs(6.0));
        assert!(result.is_some());
    }

    #[test]
    fn test_immediate_depth_check() {
        let profile = ExerciseProfile::push_up();
        let mut tracker = DepthTracker::new();
        let now = secs(0.0);

        assert!(tracker
            .check(111.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, now)
            .is_some());
        assert!(tracker
            .check(111.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, now)
            .is_some());
        assert!(tracker
            .check(110.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, now)
            .is_none());
        assert!(tracker
            .check(150.0, Stage::Down, &profile, DEFAULT_DEPTH_PERIOD, now)
            .is_none());
    }

    #[test]
    fn test_disabled_policy() {
        let mut profile = ExerciseProfile::squat();
        profile.depth_policy = DepthPolicy::Disabled;
        let mut tracker = DepthTracker::new();

        assert!(tracker
            .check(170.0, Stage::Up, &profile, DEFAULT_DEPTH_PERIOD, secs(100.0))
            .is_none());
        assert_eq!(tracker, DepthTracker::new());
    }

    fn body(shoulder: (f64, f64), hip: (f64, f64), knee: (f64, f64)) -> Vec<Keypoint> {
        let mut keypoints = vec![Keypoint::new(0.5, 0.5); LANDMARK_COUNT];
        keypoints[LEFT_SHOULDER] = Keypoint::new(shoulder.0, shoulder.1);
        keypoints[LEFT_HIP] = Keypoint::new(hip.0, hip.1);
        keypoints[LEFT_KNEE] = Keypoint::new(knee.0, knee.1);
        keypoints
    }

    #[test]
    fn test_posture_straight_back() {
        let keypoints = body((0.5, 0.2), (0.5, 0.5), (0.5, 0.8));
        let check = PostureCheck::default();
        let frame = FrameSize::new(100, 100);

        assert!(check.deviation(&keypoints, frame).unwrap() < 1e-6);
        assert!(check.check(&keypoints, frame).is_none());
    }

    #[test]
    fn test_posture_bent_back() {
        // 90° at the hip
        let keypoints = body((0.5, 0.2), (0.5, 0.5), (0.8, 0.5));
        let feedback = PostureCheck::default()
            .check(&keypoints, FrameSize::new(100, 100))
            .unwrap();

        assert_eq!(feedback.kind, FeedbackKind::PostureWarning);
        assert_eq!(feedback.message, "Straighten your back! (Deviation: 90.0°)");
    }

    #[test]
    fn test_posture_missing_landmarks() {
        let keypoints = vec![Keypoint::new(0.5, 0.5); 12];
        assert!(PostureCheck::default()
            .check(&keypoints, FrameSize::default())
            .is_none());
    }
}
