//! Hook error types.

use thiserror::Error;

/// Errors from hook execution.
#[derive(Debug, Error)]
pub enum HookError {
    /// A tool call was denied by the gate.
    #[error("{0}")]
    Denied(#[from] warden_gate::GateError),

    /// A handler failed internally.
    #[error("hook handler error in '{name}': {message}")]
    Handler {
        /// Handler name.
        name: String,
        /// What went wrong.
        message: String,
    },

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}
