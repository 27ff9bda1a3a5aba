//! Tool gating for governed agent sessions.
//!
//! The gate sits between the host runtime and tool execution. Every tool
//! call passes through [`ToolGate::check_before`], which resolves the
//! session's role, consults the permission matrix, and either stamps the
//! call with governance metadata or returns a blocking [`GateError`]. A
//! second pass, [`ToolGate::audit_after`], redacts the output of any call
//! that executed despite a denial.
//!
//! Session state lives in a [`SessionTracker`]: an explicit, shared store
//! keyed by session id, created lazily on first tool use and torn down
//! explicitly at session end.

#![deny(unsafe_code)]

pub mod errors;
pub mod gate;
pub mod session;

pub use errors::{GateError, Result};
pub use gate::{GateDeps, GateStamp, PIVOT_TO_START_TASK, ToolGate, Violation};
pub use session::{PermissionCheck, SessionRecord, SessionTracker, ToolCallRecord, ToolCallState};
