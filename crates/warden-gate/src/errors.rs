//! Gate error types.

use thiserror::Error;
use warden_policy::AgentRole;

/// Convenience alias for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;

/// Errors raised by the tool gate.
///
/// A [`GateError::PermissionDenied`] is not incidental: it is the blocking
/// mechanism. The host receives it from the before-hook and is required to
/// skip execution of the tool.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GateError {
    /// The session's resolved role may not use the requested tool.
    #[error("{role} agent may not use {tool}: {reason}{}", pivot_suffix(.pivot))]
    PermissionDenied {
        /// Role resolved for the session at check time.
        role: AgentRole,
        /// Tool that was requested.
        tool: String,
        /// Why the call was denied.
        reason: String,
        /// Suggested alternative, when one exists.
        pivot: Option<String>,
    },
}

fn pivot_suffix(pivot: &Option<String>) -> String {
    match pivot {
        Some(pivot) => format!(" Pivot: {pivot}"),
        None => String::new(),
    }
}
