//! Persisted session metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::SessionId;

/// Durable per-session record.
///
/// Lives next to the governance state so phase and counters survive a
/// process restart. One document per session under `sessions/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    /// Session this document belongs to.
    pub session_id: SessionId,
    /// Current workflow phase label, if the session declared one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Tool calls observed this session.
    pub tool_call_count: u64,
    /// Compaction events observed this session.
    pub compaction_count: u64,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// Last activity observed.
    pub last_seen_at: DateTime<Utc>,
}

impl SessionDocument {
    /// Start a fresh document for a session.
    #[must_use]
    pub fn start(session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            phase: None,
            tool_call_count: 0,
            compaction_count: 0,
            started_at: now,
            last_seen_at: now,
        }
    }

    /// Count a tool call and refresh activity.
    pub fn note_tool_call(&mut self, now: DateTime<Utc>) {
        self.tool_call_count += 1;
        self.last_seen_at = now;
    }

    /// Count a compaction event and refresh activity.
    pub fn note_compaction(&mut self, now: DateTime<Utc>) {
        self.compaction_count += 1;
        self.last_seen_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_and_activity() {
        let started: DateTime<Utc> = "2026-02-01T00:00:00Z".parse().unwrap();
        let later: DateTime<Utc> = "2026-02-01T00:05:00Z".parse().unwrap();
        let mut doc = SessionDocument::start(SessionId::new(), started);

        doc.note_tool_call(later);
        doc.note_tool_call(later);
        doc.note_compaction(later);

        assert_eq!(doc.tool_call_count, 2);
        assert_eq!(doc.compaction_count, 1);
        assert_eq!(doc.started_at, started);
        assert_eq!(doc.last_seen_at, later);
    }

    #[test]
    fn serde_omits_unset_phase() {
        let doc = SessionDocument::start(SessionId::new(), "2026-02-01T00:00:00Z".parse().unwrap());
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("phase").is_none());
        assert_eq!(json["toolCallCount"], 0);
    }
}
