//! The governance handlers.
//!
//! These wire the gate, the ledger, the anchor store, and persistence into
//! the host's lifecycle. Install them all with
//! [`install_governance_hooks`]; the host then only needs to dispatch
//! contexts at the right moments.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use warden_anchors::{DirectiveInput, build_directive};
use warden_gate::{GateDeps, GateError, ToolGate};
use warden_policy::detect_agent_role;
use warden_store::{SessionDocument, StateStore};

use crate::errors::HookError;
use crate::handler::HookHandler;
use crate::registry::HookRegistry;
use crate::types::{HookContext, HookPoint, HookResult};

/// Event name the host emits when a session starts.
pub const EVENT_SESSION_STARTED: &str = "session.started";

/// Event name the host emits when a session ends.
pub const EVENT_SESSION_ENDED: &str = "session.ended";

/// [`GateDeps`] over the persisted governance snapshot.
///
/// The gate asks for the active task on every write check; reading the
/// snapshot each time keeps the answer consistent with what the ledger
/// last persisted.
#[derive(Debug, Clone)]
pub struct StoreDeps {
    store: Arc<StateStore>,
}

impl StoreDeps {
    /// Wrap a store handle.
    #[must_use]
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }
}

impl GateDeps for StoreDeps {
    fn active_task_id(&self) -> Option<warden_core::TaskId> {
        self.store.read_state().active_task_id
    }
}

/// Pre-execution gate check. Stamps allowed calls, blocks denied ones.
pub struct GateBeforeHook<D: GateDeps> {
    gate: Arc<ToolGate<D>>,
}

impl<D: GateDeps> GateBeforeHook<D> {
    /// Create the handler over a shared gate.
    #[must_use]
    pub fn new(gate: Arc<ToolGate<D>>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl<D: GateDeps + 'static> HookHandler for GateBeforeHook<D> {
    fn name(&self) -> &str {
        "warden-gate-before"
    }

    fn point(&self) -> HookPoint {
        HookPoint::ToolExecuteBefore
    }

    // Runs before any host-registered before-hooks.
    fn priority(&self) -> i32 {
        100
    }

    fn description(&self) -> Option<&str> {
        Some("permission check and governance stamp before tool execution")
    }

    async fn handle(&self, context: &mut HookContext) -> Result<HookResult, HookError> {
        let HookContext::ToolExecuteBefore {
            session_id,
            timestamp,
            call_id,
            tool,
            args,
        } = context
        else {
            return Ok(HookResult::continue_());
        };

        match self.gate.check_before(session_id, call_id, tool, *timestamp) {
            Ok(stamp) => {
                stamp.apply_to(args);
                Ok(HookResult::continue_())
            }
            Err(denial) => {
                let GateError::PermissionDenied {
                    role,
                    tool,
                    reason,
                    pivot,
                } = &denial;
                let detail = serde_json::json!({
                    "role": role,
                    "tool": tool,
                    "reason": reason,
                    "pivot": pivot,
                });
                Ok(HookResult::block_with_detail(denial.to_string(), detail))
            }
        }
    }
}

/// Post-execution audit. Redacts output of calls that ran despite denial
/// and counts the call against the session document.
pub struct GateAfterHook<D: GateDeps> {
    gate: Arc<ToolGate<D>>,
    store: Arc<StateStore>,
}

impl<D: GateDeps> GateAfterHook<D> {
    /// Create the handler over a shared gate and store.
    #[must_use]
    pub fn new(gate: Arc<ToolGate<D>>, store: Arc<StateStore>) -> Self {
        Self { gate, store }
    }
}

#[async_trait]
impl<D: GateDeps + 'static> HookHandler for GateAfterHook<D> {
    fn name(&self) -> &str {
        "warden-gate-after"
    }

    fn point(&self) -> HookPoint {
        HookPoint::ToolExecuteAfter
    }

    fn description(&self) -> Option<&str> {
        Some("audit pass over executed tool calls")
    }

    async fn handle(&self, context: &mut HookContext) -> Result<HookResult, HookError> {
        let HookContext::ToolExecuteAfter {
            session_id,
            timestamp,
            call_id,
            tool,
            output,
            title,
            metadata,
        } = context
        else {
            return Ok(HookResult::continue_());
        };

        if let Some(violation) = self
            .gate
            .audit_after(session_id, call_id, tool, output, *timestamp)
        {
            *title = Some("governance violation".to_owned());
            match serde_json::to_value(&violation) {
                Ok(value) => {
                    if let serde_json::Value::Object(map) = metadata {
                        let _ = map.insert("governanceViolation".to_owned(), value);
                    }
                }
                Err(err) => warn!(%err, "violation metadata not serializable"),
            }
        }

        let mut doc = self
            .store
            .load_session(session_id)
            .unwrap_or_else(|| SessionDocument::start(session_id.clone(), *timestamp));
        doc.note_tool_call(*timestamp);
        if let Err(err) = self.store.save_session(&doc) {
            warn!(session_id = %session_id, %err, "session document not persisted");
        }

        Ok(HookResult::continue_())
    }
}

/// Captures the declared agent role from chat traffic.
pub struct ChatRoleHook<D: GateDeps> {
    gate: Arc<ToolGate<D>>,
}

impl<D: GateDeps> ChatRoleHook<D> {
    /// Create the handler over a shared gate.
    #[must_use]
    pub fn new(gate: Arc<ToolGate<D>>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl<D: GateDeps + 'static> HookHandler for ChatRoleHook<D> {
    fn name(&self) -> &str {
        "warden-chat-role"
    }

    fn point(&self) -> HookPoint {
        HookPoint::ChatMessage
    }

    fn description(&self) -> Option<&str> {
        Some("derives the session role from the declared agent name")
    }

    async fn handle(&self, context: &mut HookContext) -> Result<HookResult, HookError> {
        let HookContext::ChatMessage {
            session_id,
            agent_name,
            ..
        } = context
        else {
            return Ok(HookResult::continue_());
        };

        let role = detect_agent_role(agent_name);
        debug!(session_id = %session_id, agent_name = %agent_name, %role, "session role set");
        self.gate.tracker().set_role(session_id, role);
        Ok(HookResult::continue_())
    }
}

/// Injects the governance directive when the host compacts its context.
pub struct CompactionHook {
    store: Arc<StateStore>,
}

impl CompactionHook {
    /// Create the handler over a shared store.
    #[must_use]
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HookHandler for CompactionHook {
    fn name(&self) -> &str {
        "warden-compaction"
    }

    fn point(&self) -> HookPoint {
        HookPoint::SessionCompacting
    }

    fn description(&self) -> Option<&str> {
        Some("selects anchors and injects the post-compaction directive")
    }

    async fn handle(&self, context: &mut HookContext) -> Result<HookResult, HookError> {
        let HookContext::SessionCompacting {
            session_id,
            timestamp,
            context: injected,
        } = context
        else {
            return Ok(HookResult::continue_());
        };

        let anchors = self.store.load_anchors();
        let mut doc = self
            .store
            .load_session(session_id)
            .unwrap_or_else(|| SessionDocument::start(session_id.clone(), *timestamp));

        let input = DirectiveInput {
            anchors: &anchors,
            budget: self.store.config().anchor_budget,
            phase: doc.phase.as_deref(),
            session_id: session_id.as_str(),
        };
        // A failed directive means compacting with no injected context,
        // never a failed compaction.
        *injected = build_directive(&input, *timestamp);

        doc.note_compaction(*timestamp);
        if let Err(err) = self.store.save_session(&doc) {
            warn!(session_id = %session_id, %err, "session document not persisted");
        }
        Ok(HookResult::continue_())
    }
}

/// Session lifecycle bookkeeping: document creation on start, tracker
/// teardown on end.
pub struct SessionEventHook<D: GateDeps> {
    gate: Arc<ToolGate<D>>,
    store: Arc<StateStore>,
}

impl<D: GateDeps> SessionEventHook<D> {
    /// Create the handler over a shared gate and store.
    #[must_use]
    pub fn new(gate: Arc<ToolGate<D>>, store: Arc<StateStore>) -> Self {
        Self { gate, store }
    }
}

#[async_trait]
impl<D: GateDeps + 'static> HookHandler for SessionEventHook<D> {
    fn name(&self) -> &str {
        "warden-session-events"
    }

    fn point(&self) -> HookPoint {
        HookPoint::Event
    }

    fn description(&self) -> Option<&str> {
        Some("session document lifecycle and tracker teardown")
    }

    async fn handle(&self, context: &mut HookContext) -> Result<HookResult, HookError> {
        let HookContext::Event {
            session_id,
            timestamp,
            name,
            ..
        } = context
        else {
            return Ok(HookResult::continue_());
        };

        match name.as_str() {
            EVENT_SESSION_STARTED => {
                if self.store.load_session(session_id).is_none() {
                    let doc = SessionDocument::start(session_id.clone(), *timestamp);
                    if let Err(err) = self.store.save_session(&doc) {
                        warn!(session_id = %session_id, %err, "session document not persisted");
                    }
                }
            }
            EVENT_SESSION_ENDED => {
                if let Some(record) = self.gate.tracker().end_session(session_id) {
                    info!(
                        session_id = %session_id,
                        tool_calls = record.tool_calls.len(),
                        checks = record.permission_checks.len(),
                        "session ended"
                    );
                }
            }
            _ => {}
        }
        Ok(HookResult::continue_())
    }
}

/// Register the full governance handler set on a registry.
pub fn install_governance_hooks(
    registry: &mut HookRegistry,
    gate: &Arc<ToolGate<StoreDeps>>,
    store: &Arc<StateStore>,
) {
    registry.register(Arc::new(GateBeforeHook::new(Arc::clone(gate))));
    registry.register(Arc::new(GateAfterHook::new(
        Arc::clone(gate),
        Arc::clone(store),
    )));
    registry.register(Arc::new(ChatRoleHook::new(Arc::clone(gate))));
    registry.register(Arc::new(CompactionHook::new(Arc::clone(store))));
    registry.register(Arc::new(SessionEventHook::new(
        Arc::clone(gate),
        Arc::clone(store),
    )));
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
