//! Up/down stage machine with debounced rep counting.
//!
//! ```text
//!            θ <= down_threshold
//!    ┌────┐ ──────────────────────▶ ┌──────┐
//!    │ up │                         │ down │
//!    └────┘ ◀────────────────────── └──────┘
//!          θ >= up_threshold and cooldown elapsed
//!                  (count += 1)
//! ```
//!
//! Angles strictly between the thresholds never change the stage.

use crate::core::profile::ExerciseProfile;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coarse phase of a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Up,
    Down,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Up => "up",
            Stage::Down => "down",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted when a `down -> up` transition counts a rep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepEvent {
    /// Rep count after this rep
    pub count: u32,
    /// When the rep completed
    pub at: Duration,
}

/// Rep counting state for one exercise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepState {
    stage: Stage,
    count: u32,
    /// `None` until the first rep; the first rep is never held back by cooldown.
    last_rep_time: Option<Duration>,
}

impl RepState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_rep_time(&self) -> Option<Duration> {
        self.last_rep_time
    }

    /// Advance the machine with one smoothed angle sample taken at `now`.
    pub fn update(&mut self, angle: f64, profile: &ExerciseProfile, now: Duration) -> Option<RepEvent> {
        match self.stage {
            Stage::Up if angle <= profile.down_threshold => {
                self.stage = Stage::Down;
                tracing::debug!(exercise = %profile.id, angle, "stage up -> down");
                None
            }
            Stage::Down if angle >= profile.up_threshold => {
                if !self.cooldown_elapsed(profile.cooldown, now) {
                    tracing::debug!(exercise = %profile.id, angle, "rep suppressed by cooldown");
                    return None;
                }
                self.stage = Stage::Up;
                self.count += 1;
                self.last_rep_time = Some(now);
                tracing::debug!(exercise = %profile.id, count = self.count, "rep complete");
                Some(RepEvent {
                    count: self.count,
                    at: now,
                })
            }
            _ => None,
        }
    }

    fn cooldown_elapsed(&self, cooldown: Duration, now: Duration) -> bool {
        match self.last_rep_time {
            Some(last) => now.saturating_sub(last) > cooldown,
            None => true,
        }
    }
}
