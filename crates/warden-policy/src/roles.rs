//! Agent roles and role detection.
//!
//! Roles are coarse capability classes. Detection is a deterministic,
//! case-insensitive keyword match against an agent's declared name.
//! Unrecognized names resolve to [`AgentRole::Meta`] — the most permissive
//! role — so unknown first-party callers are not broken; every such
//! fallback is written to the audit log so misconfigured agent names can
//! be spotted.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Capability class gating which tool categories an agent may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Read-only investigation.
    Researcher,
    /// Implementation work: reads, writes, executes.
    Builder,
    /// Verification work: reads, executes, validates.
    Validator,
    /// Orchestration: reads and delegates.
    Coordinator,
    /// Unrestricted fallback role.
    Meta,
}

/// Routing tier a role belongs to. Delegation flows coordination →
/// execution → validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTier {
    /// Plans and hands work off.
    Coordination,
    /// Does the work.
    Execution,
    /// Checks the work.
    Validation,
}

impl AgentRole {
    /// Returns all role variants.
    #[must_use]
    pub fn all() -> &'static [AgentRole] {
        &[
            Self::Researcher,
            Self::Builder,
            Self::Validator,
            Self::Coordinator,
            Self::Meta,
        ]
    }

    /// The delegation-routing tier this role belongs to.
    #[must_use]
    pub fn tier(self) -> RoleTier {
        match self {
            Self::Coordinator | Self::Meta => RoleTier::Coordination,
            Self::Researcher | Self::Builder => RoleTier::Execution,
            Self::Validator => RoleTier::Validation,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Researcher => write!(f, "researcher"),
            Self::Builder => write!(f, "builder"),
            Self::Validator => write!(f, "validator"),
            Self::Coordinator => write!(f, "coordinator"),
            Self::Meta => write!(f, "meta"),
        }
    }
}

impl std::fmt::Display for RoleTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coordination => write!(f, "coordination"),
            Self::Execution => write!(f, "execution"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Keyword → role table, checked in order against the lowercased name.
/// Earlier entries win, so more specific keywords come first.
const ROLE_KEYWORDS: &[(&str, AgentRole)] = &[
    ("coordinat", AgentRole::Coordinator),
    ("orchestrat", AgentRole::Coordinator),
    ("planner", AgentRole::Coordinator),
    ("manager", AgentRole::Coordinator),
    ("research", AgentRole::Researcher),
    ("investigat", AgentRole::Researcher),
    ("explor", AgentRole::Researcher),
    ("analys", AgentRole::Researcher),
    ("analyz", AgentRole::Researcher),
    ("build", AgentRole::Builder),
    ("implement", AgentRole::Builder),
    ("develop", AgentRole::Builder),
    ("coder", AgentRole::Builder),
    ("engineer", AgentRole::Builder),
    ("fixer", AgentRole::Builder),
    ("valid", AgentRole::Validator),
    ("verif", AgentRole::Validator),
    ("review", AgentRole::Validator),
    ("tester", AgentRole::Validator),
    ("audit", AgentRole::Validator),
    ("meta", AgentRole::Meta),
    ("general", AgentRole::Meta),
];

/// Resolve an agent's declared name to a role.
///
/// Case-insensitive keyword match against [`ROLE_KEYWORDS`]. Unmatched
/// names default to [`AgentRole::Meta`] and the fallback is logged at
/// `warn` level for audit.
#[must_use]
pub fn detect_agent_role(name: &str) -> AgentRole {
    let lowered = name.to_lowercase();
    for (keyword, role) in ROLE_KEYWORDS {
        if lowered.contains(keyword) {
            return *role;
        }
    }
    warn!(
        agent_name = %name,
        fallback = %AgentRole::Meta,
        "unrecognized agent name, defaulting to most-permissive role"
    );
    AgentRole::Meta
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_builtin_names() {
        assert_eq!(detect_agent_role("researcher"), AgentRole::Researcher);
        assert_eq!(detect_agent_role("builder"), AgentRole::Builder);
        assert_eq!(detect_agent_role("validator"), AgentRole::Validator);
        assert_eq!(detect_agent_role("coordinator"), AgentRole::Coordinator);
        assert_eq!(detect_agent_role("meta"), AgentRole::Meta);
    }

    #[test]
    fn detect_is_case_insensitive() {
        assert_eq!(detect_agent_role("Code-Builder"), AgentRole::Builder);
        assert_eq!(detect_agent_role("RESEARCH-BOT"), AgentRole::Researcher);
    }

    #[test]
    fn detect_matches_compound_names() {
        assert_eq!(detect_agent_role("api-implementer"), AgentRole::Builder);
        assert_eq!(detect_agent_role("spec-reviewer"), AgentRole::Validator);
        assert_eq!(
            detect_agent_role("session-orchestrator"),
            AgentRole::Coordinator
        );
        assert_eq!(detect_agent_role("deep-investigator"), AgentRole::Researcher);
    }

    #[test]
    fn earlier_keyword_wins_on_ambiguous_names() {
        // "build-coordinator" matches both "coordinat" and "build"; the
        // earlier coordination entry must win.
        assert_eq!(detect_agent_role("build-coordinator"), AgentRole::Coordinator);
    }

    #[test]
    fn unmatched_name_defaults_to_meta() {
        assert_eq!(detect_agent_role("zephyr"), AgentRole::Meta);
        assert_eq!(detect_agent_role(""), AgentRole::Meta);
    }

    #[test]
    fn tiers() {
        assert_eq!(AgentRole::Coordinator.tier(), RoleTier::Coordination);
        assert_eq!(AgentRole::Meta.tier(), RoleTier::Coordination);
        assert_eq!(AgentRole::Builder.tier(), RoleTier::Execution);
        assert_eq!(AgentRole::Researcher.tier(), RoleTier::Execution);
        assert_eq!(AgentRole::Validator.tier(), RoleTier::Validation);
    }

    #[test]
    fn all_returns_five_variants() {
        assert_eq!(AgentRole::all().len(), 5);
    }

    #[test]
    fn display_is_lowercase() {
        for role in AgentRole::all() {
            let shown = role.to_string();
            assert_eq!(shown, shown.to_lowercase());
        }
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&AgentRole::Builder).unwrap(),
            "\"builder\""
        );
        let back: AgentRole = serde_json::from_str("\"validator\"").unwrap();
        assert_eq!(back, AgentRole::Validator);
    }
}
