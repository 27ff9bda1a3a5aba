//! The in-process anchor store.
//!
//! Append-only: anchors are added, never deleted or edited. Selection
//! prunes what gets injected at compaction time; the store keeps
//! everything for audit.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};
use warden_core::{AnchorId, Stamp};

use crate::types::{Anchor, AnchorKind, AnchorPriority, MAX_ANCHOR_CONTENT};

/// Parameters for adding an anchor.
#[derive(Debug, Clone)]
pub struct NewAnchor {
    /// What kind of fact this is.
    pub kind: AnchorKind,
    /// The fact itself. Clamped to [`MAX_ANCHOR_CONTENT`] characters.
    pub content: String,
    /// Survival priority.
    pub priority: AnchorPriority,
    /// Delegation depth the anchor is recorded at.
    pub traversal_depth: u32,
    /// Optional entity classification.
    pub entity_type: Option<String>,
    /// Optional focus target.
    pub focus_target: Option<String>,
    /// Optional focus reason.
    pub focus_reason: Option<String>,
}

/// Append-only collection of anchors.
#[derive(Default)]
pub struct AnchorStore {
    anchors: RwLock<Vec<Anchor>>,
}

impl AnchorStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with previously persisted anchors.
    #[must_use]
    pub fn with_anchors(anchors: Vec<Anchor>) -> Self {
        Self {
            anchors: RwLock::new(anchors),
        }
    }

    /// Add an anchor, clamping over-long content.
    ///
    /// Returns the stored anchor. Content beyond [`MAX_ANCHOR_CONTENT`]
    /// characters is cut at a character boundary and the clamp is logged.
    pub fn add(&self, new: NewAnchor, now: DateTime<Utc>) -> Anchor {
        let mut content = new.content;
        if content.chars().count() > MAX_ANCHOR_CONTENT {
            warn!(
                kind = %new.kind,
                original_chars = content.chars().count(),
                max = MAX_ANCHOR_CONTENT,
                "anchor content clamped"
            );
            content = content.chars().take(MAX_ANCHOR_CONTENT).collect();
        }

        let anchor = Anchor {
            id: AnchorId::new(),
            kind: new.kind,
            content,
            priority: new.priority,
            stamp: Stamp::at(now),
            traversal_depth: new.traversal_depth,
            entity_type: new.entity_type,
            focus_target: new.focus_target,
            focus_reason: new.focus_reason,
        };
        debug!(anchor_id = %anchor.id, kind = %anchor.kind, priority = %anchor.priority, "anchor added");
        self.anchors.write().push(anchor.clone());
        anchor
    }

    /// Snapshot of every anchor, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<Anchor> {
        self.anchors.read().clone()
    }

    /// Number of anchors held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.read().len()
    }

    /// Whether the store holds no anchors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.read().is_empty()
    }
}

impl std::fmt::Debug for AnchorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorStore")
            .field("anchor_count", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
