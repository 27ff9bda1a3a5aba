//! Record timestamps and derived staleness.
//!
//! Every governed record carries a [`Stamp`]: when it was created, when it
//! was last modified, and optionally when it was last validated. Staleness
//! is always derived from the stamp against a caller-supplied clock — it is
//! recomputed on read and never trusted from storage.
//!
//! A record goes stale when more than [`STALE_AFTER_HOURS`] hours have
//! passed since `validated_at` (falling back to `modified_at`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hours after which an unvalidated record is considered stale.
pub const STALE_AFTER_HOURS: f64 = 48.0;

/// Creation/modification/validation timestamps for a governed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamp {
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub modified_at: DateTime<Utc>,
    /// When the record was last explicitly validated, if ever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
}

impl Stamp {
    /// Create a fresh stamp at the given instant.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            modified_at: now,
            validated_at: None,
        }
    }

    /// Record a modification.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.modified_at = now;
    }

    /// Record an explicit validation. Resets the staleness reference point.
    pub fn mark_validated(&mut self, now: DateTime<Utc>) {
        self.validated_at = Some(now);
    }

    /// The instant staleness is measured from: `validated_at` when present,
    /// otherwise `modified_at`.
    #[must_use]
    pub fn reference_instant(&self) -> DateTime<Utc> {
        self.validated_at.unwrap_or(self.modified_at)
    }

    /// Hours elapsed since the reference instant, clamped at zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn staleness_hours(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now.signed_duration_since(self.reference_instant());
        (elapsed.num_seconds() as f64 / 3600.0).max(0.0)
    }

    /// Whether the record is stale at the given instant.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.staleness_hours(now) > STALE_AFTER_HOURS
    }

    /// Derive a full staleness report for the given instant.
    #[must_use]
    pub fn staleness(&self, now: DateTime<Utc>) -> Staleness {
        let hours = self.staleness_hours(now);
        Staleness {
            staleness_hours: hours,
            is_stale: hours > STALE_AFTER_HOURS,
        }
    }

    /// Minutes elapsed since the last modification, clamped at zero.
    ///
    /// Task idle-time warnings use minutes since `modified_at` directly,
    /// ignoring `validated_at`.
    #[must_use]
    pub fn minutes_since_modified(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.modified_at)
            .num_minutes()
            .max(0)
    }
}

/// Derived staleness report. Computed on read, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staleness {
    /// Hours since the record was last validated or modified.
    pub staleness_hours: f64,
    /// Whether the record has crossed the staleness threshold.
    pub is_stale: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
