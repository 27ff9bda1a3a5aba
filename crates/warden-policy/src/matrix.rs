//! Role × category permission matrix.
//!
//! `decide` is the single authority for "may this role use this tool". It is
//! total and deterministic: every (role, tool name) pair yields a decision,
//! and the same pair always yields the same decision. Tools that resolve to
//! no category are allowed by default so unknown host tools are never
//! silently bricked.

use serde::{Deserialize, Serialize};

use crate::categories::{ToolCategory, categorize_tool};
use crate::roles::AgentRole;

/// Pivot suggested when a role lacks write or execute permission.
pub const PIVOT_TO_BUILDER: &str = "Delegate to builder agent using task tool";

/// Pivot suggested when a role lacks validate permission.
pub const PIVOT_TO_VALIDATOR: &str = "Delegate to validator agent using task tool";

/// Pivot suggested when a role lacks delegate permission.
pub const PIVOT_TO_COORDINATOR: &str = "Ask coordinator agent to route this work";

const RESEARCHER_PERMISSIONS: &[ToolCategory] = &[ToolCategory::Read];

const BUILDER_PERMISSIONS: &[ToolCategory] = &[
    ToolCategory::Read,
    ToolCategory::Write,
    ToolCategory::Execute,
];

const VALIDATOR_PERMISSIONS: &[ToolCategory] = &[
    ToolCategory::Read,
    ToolCategory::Execute,
    ToolCategory::Validate,
];

const COORDINATOR_PERMISSIONS: &[ToolCategory] = &[ToolCategory::Read, ToolCategory::Delegate];

const META_PERMISSIONS: &[ToolCategory] = &[
    ToolCategory::Read,
    ToolCategory::Write,
    ToolCategory::Execute,
    ToolCategory::Delegate,
    ToolCategory::Validate,
];

/// Categories a role is permitted to use.
#[must_use]
pub fn role_permissions(role: AgentRole) -> &'static [ToolCategory] {
    match role {
        AgentRole::Researcher => RESEARCHER_PERMISSIONS,
        AgentRole::Builder => BUILDER_PERMISSIONS,
        AgentRole::Validator => VALIDATOR_PERMISSIONS,
        AgentRole::Coordinator => COORDINATOR_PERMISSIONS,
        AgentRole::Meta => META_PERMISSIONS,
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDecision {
    /// Whether the tool call may proceed.
    pub allowed: bool,
    /// Human-readable explanation of the decision.
    pub reason: String,
    /// Suggested alternative when denied, if one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<String>,
    /// Category the tool resolved to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ToolCategory>,
}

/// Decide whether `role` may use the tool named `tool_name`.
#[must_use]
pub fn decide(role: AgentRole, tool_name: &str) -> PermissionDecision {
    let Some(category) = categorize_tool(tool_name) else {
        return PermissionDecision {
            allowed: true,
            reason: format!("tool \"{tool_name}\" is uncategorized; allowing by default"),
            pivot: None,
            category: None,
        };
    };

    if role_permissions(role).contains(&category) {
        PermissionDecision {
            allowed: true,
            reason: format!("{role} role permits {category} tools"),
            pivot: None,
            category: Some(category),
        }
    } else {
        PermissionDecision {
            allowed: false,
            reason: format!("{role} role does not permit {category} tools"),
            pivot: pivot_for(category).map(str::to_owned),
            category: Some(category),
        }
    }
}

/// Suggested alternative for a denied category.
fn pivot_for(category: ToolCategory) -> Option<&'static str> {
    match category {
        ToolCategory::Write | ToolCategory::Execute => Some(PIVOT_TO_BUILDER),
        ToolCategory::Validate => Some(PIVOT_TO_VALIDATOR),
        ToolCategory::Delegate => Some(PIVOT_TO_COORDINATOR),
        // Every role carries read, so a read denial never surfaces.
        ToolCategory::Read => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
