//! Picks the single message shown for a frame.

use serde::{Deserialize, Serialize};

/// Feedback category. Variants are ordered by priority, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    RepComplete,
    DepthWarning,
    PostureWarning,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::RepComplete => "rep_complete",
            FeedbackKind::DepthWarning => "depth_warning",
            FeedbackKind::PostureWarning => "posture_warning",
        }
    }
}

/// A coaching message with its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl Feedback {
    pub fn rep_complete(count: u32) -> Self {
        Self {
            kind: FeedbackKind::RepComplete,
            message: format!("Rep {count} complete!"),
        }
    }

    pub fn depth(message: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::DepthWarning,
            message: message.into(),
        }
    }

    pub fn posture(deviation: f64) -> Self {
        Self {
            kind: FeedbackKind::PostureWarning,
            message: format!("Straighten your back! (Deviation: {deviation:.1}°)"),
        }
    }
}

/// Select the highest-priority candidate.
///
/// Posture beats depth beats rep completion. Among candidates of the same
/// kind the first one wins.
pub fn arbitrate<I>(candidates: I) -> Option<Feedback>
where
    I: IntoIterator<Item = Feedback>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(b) if b.kind >= candidate.kind => Some(b),
        _ => Some(candidate),
    })
}
