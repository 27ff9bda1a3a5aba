//! # warden-hooks
//!
//! The host hook surface for the Warden governance engine.
//!
//! Hooks fire at five lifecycle points:
//! [`ToolExecuteBefore`](types::HookPoint::ToolExecuteBefore) (blocking
//! permission check), [`ToolExecuteAfter`](types::HookPoint::ToolExecuteAfter)
//! (audit and redaction), [`ChatMessage`](types::HookPoint::ChatMessage)
//! (role capture), [`SessionCompacting`](types::HookPoint::SessionCompacting)
//! (directive injection), and [`Event`](types::HookPoint::Event) (session
//! lifecycle).
//!
//! Only the before-tool point can fail the operation; every other handler
//! error is logged and swallowed so governance observation never takes a
//! session down. [`handlers::install_governance_hooks`] wires the full
//! handler set over a shared gate and store.

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod types;

pub use engine::HookEngine;
pub use errors::HookError;
pub use handler::HookHandler;
pub use handlers::{
    ChatRoleHook, CompactionHook, EVENT_SESSION_ENDED, EVENT_SESSION_STARTED, GateAfterHook,
    GateBeforeHook, SessionEventHook, StoreDeps, install_governance_hooks,
};
pub use registry::HookRegistry;
pub use types::{HookAction, HookContext, HookPoint, HookResult};
