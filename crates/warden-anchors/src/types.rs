//! Anchor types.
//!
//! An anchor is a small, prioritized fact that should survive a
//! context-compaction event. Anchors are immutable once created; only
//! their staleness is re-derived on read.

use serde::{Deserialize, Serialize};
use warden_core::{AnchorId, Stamp};

/// Maximum characters an anchor's content may hold.
pub const MAX_ANCHOR_CONTENT: usize = 2000;

/// What kind of fact an anchor preserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    /// A decision that was made and why.
    Decision,
    /// Background the agent needs to keep in mind.
    Context,
    /// A known-good point to return to.
    Checkpoint,
    /// A failure worth not repeating.
    Error,
    /// Something that needs follow-up.
    Attention,
}

impl std::fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decision => write!(f, "decision"),
            Self::Context => write!(f, "context"),
            Self::Checkpoint => write!(f, "checkpoint"),
            Self::Error => write!(f, "error"),
            Self::Attention => write!(f, "attention"),
        }
    }
}

/// How hard an anchor fights to survive selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPriority {
    /// Nice to keep.
    Low,
    /// Worth keeping.
    Medium,
    /// Important.
    High,
    /// Never dropped for staleness alone.
    Critical,
}

impl AnchorPriority {
    /// Base score contribution for this priority.
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            Self::Critical => 100.0,
            Self::High => 75.0,
            Self::Medium => 50.0,
            Self::Low => 25.0,
        }
    }
}

impl std::fmt::Display for AnchorPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A context-preservation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    /// Unique id.
    pub id: AnchorId,
    /// What kind of fact this is.
    pub kind: AnchorKind,
    /// The fact itself, at most [`MAX_ANCHOR_CONTENT`] characters.
    pub content: String,
    /// Survival priority.
    pub priority: AnchorPriority,
    /// Timestamps; staleness is derived from these on read.
    pub stamp: Stamp,
    /// How many delegation hops deep the anchor was recorded at.
    pub traversal_depth: u32,
    /// Entity classification, when the writer supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// What the anchor points the agent at, if anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_target: Option<String>,
    /// Why that target matters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_reason: Option<String>,
}
