//! The tool gate: pre-execution permission checks and post-execution audit.
//!
//! [`ToolGate::check_before`] is the blocking mechanism: a denied call
//! returns [`GateError::PermissionDenied`] and the host is required to skip
//! execution. [`ToolGate::audit_after`] is the fallback for hosts that ran
//! the tool anyway: it can only redact and annotate the reported output —
//! it cannot un-execute a side effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};
use warden_core::{SessionId, TaskId};
use warden_policy::{AgentRole, ToolCategory, decide};

use crate::errors::{GateError, Result};
use crate::session::{PermissionCheck, SessionTracker};

/// Pivot suggested when a write is denied because no task is active.
pub const PIVOT_TO_START_TASK: &str = "Start a task with the ledger tool before writing";

/// Role assumed for a session that has not declared one yet.
///
/// Deliberately the most restrictive role: an unidentified session can read
/// but must declare itself before it may write, execute, or delegate.
pub const DEFAULT_SESSION_ROLE: AgentRole = AgentRole::Researcher;

/// State the gate needs from the rest of the engine.
///
/// Injected so the gate can enforce the "active task gates writes"
/// invariant without coupling to the persisted ledger.
pub trait GateDeps: Send + Sync {
    /// The currently active task, if any.
    fn active_task_id(&self) -> Option<TaskId>;
}

/// Governance metadata attached to an allowed call's outgoing arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStamp {
    /// Always `true`; marks the call as having passed the gate.
    pub governance_checked: bool,
    /// Role the call was checked as.
    pub checked_role: AgentRole,
    /// Session the check ran in.
    pub session_id: SessionId,
}

impl GateStamp {
    /// Merge this stamp into a JSON argument object.
    ///
    /// Non-object arguments are left untouched; the stamp is audit
    /// metadata, not worth corrupting a tool's positional arguments over.
    pub fn apply_to(&self, args: &mut Value) {
        let Value::Object(map) = args else {
            debug!(session_id = %self.session_id, "non-object tool args, stamp not attached");
            return;
        };
        let _ = map.insert("governanceChecked".to_owned(), Value::Bool(true));
        let _ = map.insert(
            "checkedRole".to_owned(),
            Value::String(self.checked_role.to_string()),
        );
        let _ = map.insert(
            "sessionId".to_owned(),
            Value::String(self.session_id.to_string()),
        );
    }
}

/// A call that produced output despite a recorded denial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Tool that executed despite the denial.
    pub tool: String,
    /// Why the call had been denied.
    pub reason: String,
    /// The output the tool produced, preserved for audit.
    pub original_output: String,
}

/// The interception point for every tool invocation.
pub struct ToolGate<D: GateDeps> {
    tracker: SessionTracker,
    deps: D,
}

impl<D: GateDeps> ToolGate<D> {
    /// Create a gate with its own empty session tracker.
    #[must_use]
    pub fn new(deps: D) -> Self {
        Self {
            tracker: SessionTracker::new(),
            deps,
        }
    }

    /// The gate's session tracker.
    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Check a tool call before execution.
    ///
    /// Records the call and the decision in the session's audit history.
    /// Returns a [`GateStamp`] to merge into the outgoing arguments when
    /// allowed, or [`GateError::PermissionDenied`] — which the host must
    /// treat as "do not execute" — when denied.
    pub fn check_before(
        &self,
        session_id: &SessionId,
        call_id: &str,
        tool: &str,
        now: DateTime<Utc>,
    ) -> Result<GateStamp> {
        let role = self.tracker.with_session(session_id, |record| {
            record.note_first_tool(tool);
            record.register_call(call_id, tool, now);
            record.agent_role.unwrap_or(DEFAULT_SESSION_ROLE)
        });

        let mut decision = decide(role, tool);

        // Writes additionally require an active task, even for roles whose
        // matrix row permits the write category.
        if decision.allowed
            && decision.category == Some(ToolCategory::Write)
            && self.deps.active_task_id().is_none()
        {
            decision.allowed = false;
            decision.reason = format!("{role} may write, but no task is active");
            decision.pivot = Some(PIVOT_TO_START_TASK.to_owned());
        }

        self.tracker.with_session(session_id, |record| {
            record.record_check(PermissionCheck {
                tool: tool.to_owned(),
                category: decision.category,
                allowed: decision.allowed,
                reason: decision.reason.clone(),
                timestamp: now,
            });
        });

        if decision.allowed {
            self.tracker.with_session(session_id, |record| {
                record.start_call(call_id, now);
            });
            debug!(session_id = %session_id, tool, %role, "tool call allowed");
            Ok(GateStamp {
                governance_checked: true,
                checked_role: role,
                session_id: session_id.clone(),
            })
        } else {
            let err = GateError::PermissionDenied {
                role,
                tool: tool.to_owned(),
                reason: decision.reason.clone(),
                pivot: decision.pivot,
            };
            self.tracker.with_session(session_id, |record| {
                record.fail_call(call_id, now, decision.reason.clone());
            });
            warn!(session_id = %session_id, tool, %role, reason = %decision.reason, "tool call blocked");
            Err(err)
        }
    }

    /// Audit a tool call after execution.
    ///
    /// If the most recent check for this session+tool was a denial yet the
    /// tool produced output, the output is replaced in place with a
    /// violation notice embedding the original, and the violation is
    /// returned for the caller to tag result metadata with. This pass can
    /// only redact what is reported — any side effect already happened.
    ///
    /// Never fails: audit problems are logged and swallowed.
    pub fn audit_after(
        &self,
        session_id: &SessionId,
        call_id: &str,
        tool: &str,
        output: &mut String,
        now: DateTime<Utc>,
    ) -> Option<Violation> {
        let denied_reason = self.tracker.with_session(session_id, |record| {
            record
                .last_check_for(tool)
                .filter(|check| !check.allowed)
                .map(|check| check.reason.clone())
        });

        let Some(reason) = denied_reason else {
            self.tracker.with_session(session_id, |record| {
                record.complete_call(call_id, now);
            });
            return None;
        };

        if output.is_empty() {
            // Blocking held; nothing to redact.
            return None;
        }

        error!(
            session_id = %session_id,
            tool,
            "tool executed despite denial, redacting output"
        );
        let violation = Violation {
            tool: tool.to_owned(),
            reason: reason.clone(),
            original_output: std::mem::take(output),
        };
        *output = format!(
            "GOVERNANCE VIOLATION: the \"{tool}\" call was denied ({reason}) but executed \
             anyway. Its output has been withheld and preserved for audit. Do not rely on \
             this call's effects.\n\n--- original output (audit) ---\n{}",
            violation.original_output
        );
        self.tracker.with_session(session_id, |record| {
            record.fail_call(call_id, now, "executed despite denial");
        });
        Some(violation)
    }
}

impl<D: GateDeps> std::fmt::Debug for ToolGate<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolGate")
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ToolCallState;
    use serde_json::json;

    struct MockDeps {
        active_task: Option<TaskId>,
    }

    impl GateDeps for MockDeps {
        fn active_task_id(&self) -> Option<TaskId> {
            self.active_task.clone()
        }
    }

    fn gate_with_active_task() -> ToolGate<MockDeps> {
        ToolGate::new(MockDeps {
            active_task: Some(TaskId::from("tsk-1")),
        })
    }

    fn gate_without_active_task() -> ToolGate<MockDeps> {
        ToolGate::new(MockDeps { active_task: None })
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn undeclared_session_is_checked_as_researcher() {
        let gate = gate_with_active_task();
        let session = SessionId::new();

        let err = gate
            .check_before(&session, "call-1", "write", at(0))
            .unwrap_err();
        match err {
            GateError::PermissionDenied { role, pivot, .. } => {
                assert_eq!(role, AgentRole::Researcher);
                assert_eq!(
                    pivot.as_deref(),
                    Some("Delegate to builder agent using task tool")
                );
            }
        }
    }

    #[test]
    fn declared_builder_may_write_with_active_task() {
        let gate = gate_with_active_task();
        let session = SessionId::new();
        gate.tracker().set_role(&session, AgentRole::Builder);

        let stamp = gate
            .check_before(&session, "call-1", "write", at(0))
            .unwrap();
        assert!(stamp.governance_checked);
        assert_eq!(stamp.checked_role, AgentRole::Builder);
        assert_eq!(stamp.session_id, session);
    }

    #[test]
    fn builder_write_denied_without_active_task() {
        let gate = gate_without_active_task();
        let session = SessionId::new();
        gate.tracker().set_role(&session, AgentRole::Builder);

        let err = gate
            .check_before(&session, "call-1", "edit", at(0))
            .unwrap_err();
        match err {
            GateError::PermissionDenied { reason, pivot, .. } => {
                assert!(reason.contains("no task is active"), "reason: {reason}");
                assert_eq!(pivot.as_deref(), Some(PIVOT_TO_START_TASK));
            }
        }
    }

    #[test]
    fn reads_do_not_require_an_active_task() {
        let gate = gate_without_active_task();
        let session = SessionId::new();
        assert!(gate.check_before(&session, "call-1", "grep", at(0)).is_ok());
    }

    #[test]
    fn unknown_tool_fails_open() {
        let gate = gate_without_active_task();
        let session = SessionId::new();
        let stamp = gate
            .check_before(&session, "call-1", "mcp__weather", at(0))
            .unwrap();
        assert_eq!(stamp.checked_role, AgentRole::Researcher);
    }

    #[test]
    fn first_tool_and_audit_trail_are_recorded() {
        let gate = gate_with_active_task();
        let session = SessionId::new();
        gate.tracker().set_role(&session, AgentRole::Builder);

        let _ = gate.check_before(&session, "call-1", "read", at(0)).unwrap();
        let _ = gate.check_before(&session, "call-2", "bash", at(1)).unwrap();

        let record = gate.tracker().get(&session).unwrap();
        assert_eq!(record.first_tool.as_deref(), Some("read"));
        assert_eq!(record.permission_checks.len(), 2);
        assert!(record.permission_checks.iter().all(|check| check.allowed));
    }

    #[test]
    fn denied_call_is_recorded_as_failed() {
        let gate = gate_with_active_task();
        let session = SessionId::new();

        let _ = gate.check_before(&session, "call-1", "bash", at(0));
        let record = gate.tracker().get(&session).unwrap();
        assert!(matches!(
            record.call_state("call-1"),
            Some(ToolCallState::Error { .. })
        ));
    }

    #[test]
    fn stamp_merges_into_object_args() {
        let gate = gate_with_active_task();
        let session = SessionId::from("ses-42");
        gate.tracker().set_role(&session, AgentRole::Builder);

        let stamp = gate
            .check_before(&session, "call-1", "write", at(0))
            .unwrap();
        let mut args = json!({"file_path": "/tmp/x"});
        stamp.apply_to(&mut args);
        assert_eq!(args["governanceChecked"], true);
        assert_eq!(args["checkedRole"], "builder");
        assert_eq!(args["sessionId"], "ses-42");
        assert_eq!(args["file_path"], "/tmp/x");
    }

    #[test]
    fn stamp_leaves_non_object_args_alone() {
        let stamp = GateStamp {
            governance_checked: true,
            checked_role: AgentRole::Meta,
            session_id: SessionId::from("ses-1"),
        };
        let mut args = json!("raw string args");
        stamp.apply_to(&mut args);
        assert_eq!(args, json!("raw string args"));
    }

    #[test]
    fn audit_after_completes_allowed_calls() {
        let gate = gate_with_active_task();
        let session = SessionId::new();
        let _ = gate.check_before(&session, "call-1", "read", at(0)).unwrap();

        let mut output = "file contents".to_owned();
        let violation = gate.audit_after(&session, "call-1", "read", &mut output, at(1));
        assert!(violation.is_none());
        assert_eq!(output, "file contents");

        let record = gate.tracker().get(&session).unwrap();
        assert!(matches!(
            record.call_state("call-1"),
            Some(ToolCallState::Completed { .. })
        ));
    }

    #[test]
    fn audit_after_redacts_output_of_denied_call() {
        let gate = gate_with_active_task();
        let session = SessionId::new();
        // Researcher is denied write, but imagine the host executed anyway.
        let _ = gate.check_before(&session, "call-1", "write", at(0));

        let mut output = "wrote 42 bytes".to_owned();
        let violation = gate
            .audit_after(&session, "call-1", "write", &mut output, at(1))
            .expect("violation expected");

        assert_eq!(violation.tool, "write");
        assert_eq!(violation.original_output, "wrote 42 bytes");
        assert!(output.starts_with("GOVERNANCE VIOLATION"));
        assert!(output.contains("wrote 42 bytes"), "original kept for audit");
    }

    #[test]
    fn audit_after_is_quiet_when_blocking_held() {
        let gate = gate_with_active_task();
        let session = SessionId::new();
        let _ = gate.check_before(&session, "call-1", "write", at(0));

        let mut output = String::new();
        assert!(
            gate.audit_after(&session, "call-1", "write", &mut output, at(1))
                .is_none()
        );
        assert!(output.is_empty());
    }

    #[test]
    fn audit_after_never_panics_for_unknown_session() {
        let gate = gate_without_active_task();
        let session = SessionId::new();
        let mut output = "anything".to_owned();
        assert!(
            gate.audit_after(&session, "call-x", "read", &mut output, at(0))
                .is_none()
        );
    }
}
