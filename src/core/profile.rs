//! Exercise profiles: which joint to measure and where the rep boundaries are.

use crate::core::geometry::JointTriplet;
use crate::pose::types::{
    LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Control-channel identifier for push-ups.
pub const PUSH_UP_ID: &str = "13";

/// Control-channel identifier for squats.
pub const SQUAT_ID: &str = "3";

/// How depth feedback is produced for an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Track the deepest angle while down; every depth period, warn if it
    /// stayed above `down_threshold + margin`.
    Periodic { margin: f64 },
    /// Warn on every frame at the top while the angle exceeds
    /// `down_threshold + margin`.
    Immediate { margin: f64 },
    /// No depth feedback.
    Disabled,
}

/// Static description of one exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    /// Identifier sent by the control channel
    pub id: String,
    /// Human-readable name (lower_snake_case)
    pub name: String,
    /// Joint whose angle drives rep counting
    pub triplet: JointTriplet,
    /// Angle (degrees) at or below which the stage becomes `down`
    pub down_threshold: f64,
    /// Angle (degrees) at or above which a rep completes
    pub up_threshold: f64,
    /// Minimum time between counted reps
    #[serde(with = "crate::config::duration_serde")]
    pub cooldown: Duration,
    pub depth_policy: DepthPolicy,
}

impl ExerciseProfile {
    /// Push-ups, measured at the elbow.
    pub fn push_up() -> Self {
        Self {
            id: PUSH_UP_ID.to_string(),
            name: "push_up".to_string(),
            triplet: JointTriplet::new(LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST),
            down_threshold: 90.0,
            up_threshold: 160.0,
            cooldown: Duration::from_millis(500),
            depth_policy: DepthPolicy::Immediate { margin: 20.0 },
        }
    }

    /// Squats, measured at the knee.
    pub fn squat() -> Self {
        Self {
            id: SQUAT_ID.to_string(),
            name: "squat".to_string(),
            triplet: JointTriplet::new(LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
            down_threshold: 97.0,
            up_threshold: 160.0,
            cooldown: Duration::from_millis(500),
            depth_policy: DepthPolicy::Periodic { margin: 15.0 },
        }
    }

    /// Check the profile invariants.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if !(self.down_threshold < self.up_threshold) {
            return Err(RegistryError::InvalidThresholds {
                id: self.id.clone(),
                down: self.down_threshold,
                up: self.up_threshold,
            });
        }
        Ok(())
    }
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    NotFound(String),
    EmptyId,
    InvalidThresholds { id: String, down: f64, up: f64 },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NotFound(id) => write!(f, "Unknown exercise: {id}"),
            RegistryError::EmptyId => write!(f, "Exercise id must not be empty"),
            RegistryError::InvalidThresholds { id, down, up } => write!(
                f,
                "Exercise {id}: down threshold {down} must be below up threshold {up}"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Read-only lookup table of exercise profiles, shared by all sessions.
#[derive(Debug, Clone, Default)]
pub struct ExerciseRegistry {
    profiles: Vec<ExerciseProfile>,
}

impl ExerciseRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in push-up and squat profiles.
    pub fn builtin() -> Self {
        Self {
            profiles: vec![ExerciseProfile::push_up(), ExerciseProfile::squat()],
        }
    }

    /// Add a profile, replacing any existing profile with the same id.
    pub fn register(&mut self, profile: ExerciseProfile) -> Result<(), RegistryError> {
        profile.validate()?;
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        Ok(())
    }

    /// Look up a profile by id, falling back to its name.
    pub fn resolve(&self, exercise_id: &str) -> Result<&ExerciseProfile, RegistryError> {
        self.profiles
            .iter()
            .find(|p| p.id == exercise_id)
            .or_else(|| self.profiles.iter().find(|p| p.name == exercise_id))
            .ok_or_else(|| RegistryError::NotFound(exercise_id.to_string()))
    }

    /// All registered profiles in registration order.
    pub fn profiles(&self) -> &[ExerciseProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
