//! Core types for the hook surface.
//!
//! The host calls into the engine at five lifecycle points. Each point has
//! a context variant; handlers receive the context mutably so they can
//! rewrite outputs in place (stamp arguments, redact tool output, inject
//! the compaction directive). All wire types use `camelCase` serde
//! renaming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::SessionId;

/// Lifecycle point a hook fires at.
///
/// `ToolExecuteBefore` is blocking: its handlers decide whether the tool
/// runs at all. The other points observe and annotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPoint {
    /// Before a tool executes. Blocking.
    ToolExecuteBefore,
    /// After a tool executed.
    ToolExecuteAfter,
    /// When a chat message arrives from an agent.
    ChatMessage,
    /// When the host is about to compact its context.
    SessionCompacting,
    /// Generic lifecycle event (session start/end and the like).
    Event,
}

impl HookPoint {
    /// Whether handler errors at this point stop the operation.
    ///
    /// Only the before-tool point blocks; everywhere else a broken handler
    /// must not take the session down.
    #[must_use]
    pub fn errors_propagate(self) -> bool {
        matches!(self, Self::ToolExecuteBefore)
    }

    /// All points, in lifecycle order.
    #[must_use]
    pub fn all() -> &'static [HookPoint] {
        &[
            Self::ToolExecuteBefore,
            Self::ToolExecuteAfter,
            Self::ChatMessage,
            Self::SessionCompacting,
            Self::Event,
        ]
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToolExecuteBefore => write!(f, "ToolExecuteBefore"),
            Self::ToolExecuteAfter => write!(f, "ToolExecuteAfter"),
            Self::ChatMessage => write!(f, "ChatMessage"),
            Self::SessionCompacting => write!(f, "SessionCompacting"),
            Self::Event => write!(f, "Event"),
        }
    }
}

/// Hook context, one variant per [`HookPoint`].
///
/// Handlers mutate output fields in place: `args` at the before point,
/// `output`/`title`/`metadata` at the after point, `context` at the
/// compacting point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hookPoint", rename_all = "camelCase")]
pub enum HookContext {
    /// Context for [`HookPoint::ToolExecuteBefore`].
    #[serde(rename_all = "camelCase")]
    ToolExecuteBefore {
        /// Session the call runs in.
        session_id: SessionId,
        /// When the hook fired.
        timestamp: DateTime<Utc>,
        /// Unique id for this tool call.
        call_id: String,
        /// Tool being invoked.
        tool: String,
        /// Arguments about to be passed to the tool. Mutable output.
        args: serde_json::Value,
    },
    /// Context for [`HookPoint::ToolExecuteAfter`].
    #[serde(rename_all = "camelCase")]
    ToolExecuteAfter {
        /// Session the call ran in.
        session_id: SessionId,
        /// When the hook fired.
        timestamp: DateTime<Utc>,
        /// Unique id for this tool call.
        call_id: String,
        /// Tool that was invoked.
        tool: String,
        /// Output the tool produced. Mutable output.
        output: String,
        /// Display title for the result. Mutable output.
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Result metadata. Mutable output.
        metadata: serde_json::Value,
    },
    /// Context for [`HookPoint::ChatMessage`].
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        /// Session the message belongs to.
        session_id: SessionId,
        /// When the hook fired.
        timestamp: DateTime<Utc>,
        /// Name the sending agent goes by.
        agent_name: String,
    },
    /// Context for [`HookPoint::SessionCompacting`].
    #[serde(rename_all = "camelCase")]
    SessionCompacting {
        /// Session being compacted.
        session_id: SessionId,
        /// When the hook fired.
        timestamp: DateTime<Utc>,
        /// Governance context to inject after compaction. Mutable output;
        /// `None` means nothing is injected.
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    /// Context for [`HookPoint::Event`].
    #[serde(rename_all = "camelCase")]
    Event {
        /// Session the event belongs to.
        session_id: SessionId,
        /// When the hook fired.
        timestamp: DateTime<Utc>,
        /// Event name, dot-separated (`session.started`, `session.ended`).
        name: String,
        /// Event payload.
        payload: serde_json::Value,
    },
}

impl HookContext {
    /// The [`HookPoint`] this context belongs to.
    #[must_use]
    pub fn point(&self) -> HookPoint {
        match self {
            Self::ToolExecuteBefore { .. } => HookPoint::ToolExecuteBefore,
            Self::ToolExecuteAfter { .. } => HookPoint::ToolExecuteAfter,
            Self::ChatMessage { .. } => HookPoint::ChatMessage,
            Self::SessionCompacting { .. } => HookPoint::SessionCompacting,
            Self::Event { .. } => HookPoint::Event,
        }
    }

    /// Session id from any variant.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::ToolExecuteBefore { session_id, .. }
            | Self::ToolExecuteAfter { session_id, .. }
            | Self::ChatMessage { session_id, .. }
            | Self::SessionCompacting { session_id, .. }
            | Self::Event { session_id, .. } => session_id,
        }
    }

    /// Timestamp from any variant.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ToolExecuteBefore { timestamp, .. }
            | Self::ToolExecuteAfter { timestamp, .. }
            | Self::ChatMessage { timestamp, .. }
            | Self::SessionCompacting { timestamp, .. }
            | Self::Event { timestamp, .. } => *timestamp,
        }
    }
}

/// Action a handler reports back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookAction {
    /// Proceed with the operation.
    Continue,
    /// Stop the operation.
    Block,
}

/// Result returned by a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResult {
    /// What the engine should do.
    pub action: HookAction,
    /// Why, when blocking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Structured fields behind the reason (camelCase keys), for hosts
    /// that act on a block programmatically rather than display it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl HookResult {
    /// A `Continue` result.
    #[must_use]
    pub fn continue_() -> Self {
        Self {
            action: HookAction::Continue,
            reason: None,
            detail: None,
        }
    }

    /// A `Block` result with a reason.
    #[must_use]
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            action: HookAction::Block,
            reason: Some(reason.into()),
            detail: None,
        }
    }

    /// A `Block` result carrying structured detail alongside the reason.
    #[must_use]
    pub fn block_with_detail(reason: impl Into<String>, detail: serde_json::Value) -> Self {
        Self {
            action: HookAction::Block,
            reason: Some(reason.into()),
            detail: Some(detail),
        }
    }

    /// Whether this result blocks the operation.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.action == HookAction::Block
    }
}
