//! # warden-policy
//!
//! Agent roles, tool categorization, and the permission matrix.
//!
//! The matrix is a pure, total function: for every role and every tool name
//! it produces an allow/deny decision with a human-readable reason and,
//! on denial, a suggested pivot. Tools whose category cannot be resolved
//! are allowed by default so unrecognized host tools keep working.

#![deny(unsafe_code)]

pub mod categories;
pub mod matrix;
pub mod roles;

pub use categories::{ToolCategory, categorize_tool};
pub use matrix::{PermissionDecision, decide, role_permissions};
pub use roles::{AgentRole, RoleTier, detect_agent_role};
