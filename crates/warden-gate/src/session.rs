//! Per-session governance state.
//!
//! A [`SessionTracker`] holds one [`SessionRecord`] per live session:
//! detected role, delegation chain, first tool used, the append-only
//! permission-check history, and the lifecycle of every tool call. Records
//! are created lazily on first use and removed by an explicit
//! [`SessionTracker::end_session`] call. Nothing here is persisted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_core::{DelegationId, SessionId};
use warden_policy::{AgentRole, ToolCategory};

/// Lifecycle of a single tool call.
///
/// Each variant carries only the timestamps valid for that state: a call
/// that never started has no `startedAt`, and only finished calls carry an
/// `endedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ToolCallState {
    /// Registered by the before-hook, not yet permitted to run.
    #[serde(rename_all = "camelCase")]
    Pending {
        /// When the host requested the call.
        requested_at: DateTime<Utc>,
    },
    /// Permitted and handed back to the host for execution.
    #[serde(rename_all = "camelCase")]
    Running {
        /// When the host requested the call.
        requested_at: DateTime<Utc>,
        /// When the gate released the call.
        started_at: DateTime<Utc>,
    },
    /// Finished normally; observed by the after-hook.
    #[serde(rename_all = "camelCase")]
    Completed {
        /// When the host requested the call.
        requested_at: DateTime<Utc>,
        /// When the gate released the call.
        started_at: DateTime<Utc>,
        /// When the after-hook observed the result.
        ended_at: DateTime<Utc>,
    },
    /// Denied, failed, or flagged by the audit pass.
    #[serde(rename_all = "camelCase")]
    Error {
        /// When the host requested the call.
        requested_at: DateTime<Utc>,
        /// When the gate released the call, if it ever ran.
        #[serde(skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
        /// When the call reached this state.
        ended_at: DateTime<Utc>,
        /// What went wrong.
        message: String,
    },
}

/// One tool call observed by the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    /// Host-assigned call id.
    pub call_id: String,
    /// Tool name as requested.
    pub tool: String,
    /// Current lifecycle state.
    #[serde(flatten)]
    pub state: ToolCallState,
}

/// One permission decision, recorded at check time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheck {
    /// Tool the check applied to.
    pub tool: String,
    /// Category the tool resolved to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ToolCategory>,
    /// Whether the call was allowed.
    pub allowed: bool,
    /// Explanation recorded with the decision.
    pub reason: String,
    /// When the check ran.
    pub timestamp: DateTime<Utc>,
}

/// In-memory governance record for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Session this record belongs to.
    pub session_id: SessionId,
    /// Role detected from chat traffic, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<AgentRole>,
    /// First tool the session ever requested. First write wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_tool: Option<String>,
    /// Delegations initiated from this session, oldest first.
    pub delegation_chain: Vec<DelegationId>,
    /// Append-only history of permission decisions.
    pub permission_checks: Vec<PermissionCheck>,
    /// Lifecycle of every tool call seen by the gate.
    pub tool_calls: Vec<ToolCallRecord>,
}

impl SessionRecord {
    /// Creates an empty record for `session_id`.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            agent_role: None,
            first_tool: None,
            delegation_chain: Vec::new(),
            permission_checks: Vec::new(),
            tool_calls: Vec::new(),
        }
    }

    /// Delegation depth observed from this session.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.delegation_chain.len()
    }

    /// Records the first tool used, if none is set yet.
    pub fn note_first_tool(&mut self, tool: &str) {
        if self.first_tool.is_none() {
            self.first_tool = Some(tool.to_owned());
        }
    }

    /// Appends a permission decision to the audit history.
    pub fn record_check(&mut self, check: PermissionCheck) {
        self.permission_checks.push(check);
    }

    /// The last `limit` permission checks, oldest first.
    #[must_use]
    pub fn recent_checks(&self, limit: usize) -> &[PermissionCheck] {
        let start = self.permission_checks.len().saturating_sub(limit);
        &self.permission_checks[start..]
    }

    /// Most recent permission check for `tool`, if any.
    #[must_use]
    pub fn last_check_for(&self, tool: &str) -> Option<&PermissionCheck> {
        self.permission_checks
            .iter()
            .rev()
            .find(|check| check.tool == tool)
    }

    /// Registers a new tool call in the `Pending` state.
    pub fn register_call(&mut self, call_id: &str, tool: &str, now: DateTime<Utc>) {
        self.tool_calls.push(ToolCallRecord {
            call_id: call_id.to_owned(),
            tool: tool.to_owned(),
            state: ToolCallState::Pending { requested_at: now },
        });
    }

    /// Transitions a pending call to `Running`.
    pub fn start_call(&mut self, call_id: &str, now: DateTime<Utc>) {
        let Some(call) = self.call_mut(call_id) else {
            warn!(call_id, "start for unknown tool call ignored");
            return;
        };
        if let ToolCallState::Pending { requested_at } = call.state {
            call.state = ToolCallState::Running {
                requested_at,
                started_at: now,
            };
        } else {
            warn!(call_id, tool = %call.tool, "start on non-pending tool call ignored");
        }
    }

    /// Transitions a running call to `Completed`.
    pub fn complete_call(&mut self, call_id: &str, now: DateTime<Utc>) {
        let Some(call) = self.call_mut(call_id) else {
            warn!(call_id, "completion for unknown tool call ignored");
            return;
        };
        if let ToolCallState::Running {
            requested_at,
            started_at,
        } = call.state
        {
            call.state = ToolCallState::Completed {
                requested_at,
                started_at,
                ended_at: now,
            };
        } else {
            warn!(call_id, tool = %call.tool, "completion on non-running tool call ignored");
        }
    }

    /// Moves a call into the `Error` state.
    ///
    /// Pending and running calls transition directly. A call already in
    /// error keeps its original window and only the message is refined;
    /// completed calls are left alone.
    pub fn fail_call(&mut self, call_id: &str, now: DateTime<Utc>, message: impl Into<String>) {
        let Some(call) = self.call_mut(call_id) else {
            warn!(call_id, "failure for unknown tool call ignored");
            return;
        };
        let message = message.into();
        call.state = match call.state.clone() {
            ToolCallState::Pending { requested_at } => ToolCallState::Error {
                requested_at,
                started_at: None,
                ended_at: now,
                message,
            },
            ToolCallState::Running {
                requested_at,
                started_at,
            } => ToolCallState::Error {
                requested_at,
                started_at: Some(started_at),
                ended_at: now,
                message,
            },
            ToolCallState::Error {
                requested_at,
                started_at,
                ended_at,
                ..
            } => ToolCallState::Error {
                requested_at,
                started_at,
                ended_at,
                message,
            },
            completed @ ToolCallState::Completed { .. } => {
                warn!(call_id, tool = %call.tool, "failure on completed tool call ignored");
                completed
            }
        };
    }

    /// Current state of a call, if the gate has seen it.
    #[must_use]
    pub fn call_state(&self, call_id: &str) -> Option<&ToolCallState> {
        self.tool_calls
            .iter()
            .rev()
            .find(|call| call.call_id == call_id)
            .map(|call| &call.state)
    }

    fn call_mut(&mut self, call_id: &str) -> Option<&mut ToolCallRecord> {
        self.tool_calls
            .iter_mut()
            .rev()
            .find(|call| call.call_id == call_id)
    }
}

/// Shared store of per-session records.
///
/// Records are created on demand by [`SessionTracker::with_session`] and
/// removed by [`SessionTracker::end_session`]. The tracker is cheap to
/// share behind an `Arc` and safe to use from concurrent hook callbacks.
#[derive(Default)]
pub struct SessionTracker {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl SessionTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the record for `session_id`, creating it if absent.
    pub fn with_session<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut SessionRecord) -> R,
    ) -> R {
        let mut entry = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| SessionRecord::new(session_id.clone()));
        f(entry.value_mut())
    }

    /// Snapshot of the record for `session_id`, if one exists.
    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    /// Sets the detected role for a session.
    pub fn set_role(&self, session_id: &SessionId, role: AgentRole) {
        self.with_session(session_id, |record| {
            if record.agent_role != Some(role) {
                debug!(session_id = %session_id, role = %role, "session role updated");
            }
            record.agent_role = Some(role);
        });
    }

    /// Appends a delegation to the session's chain.
    pub fn push_delegation(&self, session_id: &SessionId, delegation_id: DelegationId) {
        self.with_session(session_id, |record| {
            record.delegation_chain.push(delegation_id);
        });
    }

    /// Removes and returns the record for an ended session.
    pub fn end_session(&self, session_id: &SessionId) -> Option<SessionRecord> {
        let removed = self.sessions.remove(session_id).map(|(_, record)| record);
        if removed.is_some() {
            debug!(session_id = %session_id, "session tracker entry removed");
        }
        removed
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the tracker holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl std::fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTracker")
            .field("session_count", &self.sessions.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn with_session_creates_record_on_first_use() {
        let tracker = SessionTracker::new();
        let session = SessionId::new();
        assert!(tracker.get(&session).is_none());

        let depth = tracker.with_session(&session, |record| record.depth());
        assert_eq!(depth, 0);
        assert!(tracker.get(&session).is_some());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn set_role_overwrites_previous_detection() {
        let tracker = SessionTracker::new();
        let session = SessionId::new();
        tracker.set_role(&session, AgentRole::Researcher);
        tracker.set_role(&session, AgentRole::Builder);
        assert_eq!(
            tracker.get(&session).unwrap().agent_role,
            Some(AgentRole::Builder)
        );
    }

    #[test]
    fn first_tool_wins_once() {
        let mut record = SessionRecord::new(SessionId::new());
        record.note_first_tool("read");
        record.note_first_tool("write");
        assert_eq!(record.first_tool.as_deref(), Some("read"));
    }

    #[test]
    fn call_lifecycle_pending_running_completed() {
        let mut record = SessionRecord::new(SessionId::new());
        record.register_call("call-1", "read", at(0));
        assert_eq!(
            record.call_state("call-1"),
            Some(&ToolCallState::Pending {
                requested_at: at(0)
            })
        );

        record.start_call("call-1", at(1));
        assert_eq!(
            record.call_state("call-1"),
            Some(&ToolCallState::Running {
                requested_at: at(0),
                started_at: at(1),
            })
        );

        record.complete_call("call-1", at(5));
        assert_eq!(
            record.call_state("call-1"),
            Some(&ToolCallState::Completed {
                requested_at: at(0),
                started_at: at(1),
                ended_at: at(5),
            })
        );
    }

    #[test]
    fn denied_call_fails_without_a_start_time() {
        let mut record = SessionRecord::new(SessionId::new());
        record.register_call("call-1", "write", at(0));
        record.fail_call("call-1", at(1), "blocked before execution");
        assert_eq!(
            record.call_state("call-1"),
            Some(&ToolCallState::Error {
                requested_at: at(0),
                started_at: None,
                ended_at: at(1),
                message: "blocked before execution".to_owned(),
            })
        );
    }

    #[test]
    fn fail_on_errored_call_refines_message_but_keeps_window() {
        let mut record = SessionRecord::new(SessionId::new());
        record.register_call("call-1", "write", at(0));
        record.fail_call("call-1", at(1), "blocked before execution");
        record.fail_call("call-1", at(9), "executed despite denial");
        assert_eq!(
            record.call_state("call-1"),
            Some(&ToolCallState::Error {
                requested_at: at(0),
                started_at: None,
                ended_at: at(1),
                message: "executed despite denial".to_owned(),
            })
        );
    }

    #[test]
    fn completed_call_cannot_fail() {
        let mut record = SessionRecord::new(SessionId::new());
        record.register_call("call-1", "read", at(0));
        record.start_call("call-1", at(1));
        record.complete_call("call-1", at(2));
        record.fail_call("call-1", at(3), "too late");
        assert!(matches!(
            record.call_state("call-1"),
            Some(ToolCallState::Completed { .. })
        ));
    }

    #[test]
    fn start_on_running_call_is_ignored() {
        let mut record = SessionRecord::new(SessionId::new());
        record.register_call("call-1", "read", at(0));
        record.start_call("call-1", at(1));
        record.start_call("call-1", at(7));
        assert_eq!(
            record.call_state("call-1"),
            Some(&ToolCallState::Running {
                requested_at: at(0),
                started_at: at(1),
            })
        );
    }

    #[test]
    fn last_check_for_returns_most_recent() {
        let mut record = SessionRecord::new(SessionId::new());
        record.record_check(PermissionCheck {
            tool: "write".to_owned(),
            category: None,
            allowed: false,
            reason: "first".to_owned(),
            timestamp: at(0),
        });
        record.record_check(PermissionCheck {
            tool: "write".to_owned(),
            category: None,
            allowed: true,
            reason: "second".to_owned(),
            timestamp: at(1),
        });
        assert_eq!(record.last_check_for("write").unwrap().reason, "second");
        assert!(record.last_check_for("read").is_none());
    }

    #[test]
    fn recent_checks_keeps_the_tail() {
        let mut record = SessionRecord::new(SessionId::new());
        for i in 0..5 {
            record.record_check(PermissionCheck {
                tool: "read".to_owned(),
                category: None,
                allowed: true,
                reason: format!("check {i}"),
                timestamp: at(i),
            });
        }
        let tail = record.recent_checks(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].reason, "check 3");
        assert_eq!(tail[1].reason, "check 4");
        assert_eq!(record.recent_checks(100).len(), 5);
    }

    #[test]
    fn end_session_removes_and_returns_record() {
        let tracker = SessionTracker::new();
        let session = SessionId::new();
        tracker.set_role(&session, AgentRole::Validator);

        let record = tracker.end_session(&session).unwrap();
        assert_eq!(record.agent_role, Some(AgentRole::Validator));
        assert!(tracker.is_empty());
        assert!(tracker.end_session(&session).is_none());
    }

    #[test]
    fn get_returns_a_snapshot_not_a_handle() {
        let tracker = SessionTracker::new();
        let session = SessionId::new();
        tracker.set_role(&session, AgentRole::Builder);

        let mut snapshot = tracker.get(&session).unwrap();
        snapshot.agent_role = Some(AgentRole::Meta);
        assert_eq!(
            tracker.get(&session).unwrap().agent_role,
            Some(AgentRole::Builder)
        );
    }

    #[test]
    fn tool_call_state_serializes_tagged() {
        let state = ToolCallState::Error {
            requested_at: at(0),
            started_at: None,
            ended_at: at(2),
            message: "blocked before execution".to_owned(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "blocked before execution");
        assert!(json.get("startedAt").is_none());
        assert!(json["requestedAt"].is_string());
    }

    #[test]
    fn tool_call_record_flattens_state() {
        let record = ToolCallRecord {
            call_id: "call-1".to_owned(),
            tool: "read".to_owned(),
            state: ToolCallState::Pending {
                requested_at: at(0),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["callId"], "call-1");
        assert_eq!(json["state"], "pending");
        assert!(json["requestedAt"].is_string());
    }
}
