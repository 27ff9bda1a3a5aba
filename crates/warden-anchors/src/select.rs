//! Anchor scoring and budgeted selection.
//!
//! `score = priority weight + max(0, 48 − staleness hours) − 10 × depth`.
//! Selection drops stale anchors unless they are critical, sorts by
//! descending score with a stable sort (ties keep original order), and
//! truncates to the budget. Deterministic and bounded by construction.

use chrono::{DateTime, Utc};
use tracing::debug;
use warden_core::STALE_AFTER_HOURS;

use crate::types::{Anchor, AnchorPriority};

/// Score penalty per delegation hop.
const DEPTH_PENALTY: f64 = 10.0;

/// Score an anchor at the given instant.
#[must_use]
pub fn score(anchor: &Anchor, now: DateTime<Utc>) -> f64 {
    let freshness = (STALE_AFTER_HOURS - anchor.stamp.staleness_hours(now)).max(0.0);
    anchor.priority.weight() + freshness - DEPTH_PENALTY * f64::from(anchor.traversal_depth)
}

/// Select at most `budget` anchors to survive compaction.
///
/// Stale anchors are filtered out first unless their priority is
/// critical — critical anchors are never dropped for staleness alone.
#[must_use]
pub fn select_anchors(anchors: &[Anchor], budget: usize, now: DateTime<Utc>) -> Vec<Anchor> {
    let mut candidates: Vec<(f64, &Anchor)> = anchors
        .iter()
        .filter(|anchor| {
            anchor.priority == AnchorPriority::Critical || !anchor.stamp.is_stale(now)
        })
        .map(|anchor| (score(anchor, now), anchor))
        .collect();

    // Stable sort: equal scores keep their original relative order.
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(budget);

    debug!(
        total = anchors.len(),
        selected = candidates.len(),
        budget,
        "anchor selection"
    );
    candidates
        .into_iter()
        .map(|(_, anchor)| anchor.clone())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
