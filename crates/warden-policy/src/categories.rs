//! Tool categorization.
//!
//! Maps a tool name to one of five permission categories. Resolution is
//! exact match first, then an ordered substring scan. Unknown tools resolve
//! to `None`, which the matrix treats as allow-by-default so the host's
//! built-in tools keep working even when Warden has never heard of them.

use serde::{Deserialize, Serialize};

/// Permission category a tool falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Inspecting files, searching, fetching.
    Read,
    /// Creating or mutating files.
    Write,
    /// Running commands or scripts.
    Execute,
    /// Spawning or handing work to another agent.
    Delegate,
    /// Running checks, linters, or verification suites.
    Validate,
}

impl ToolCategory {
    /// Returns all category variants.
    #[must_use]
    pub fn all() -> &'static [ToolCategory] {
        &[
            Self::Read,
            Self::Write,
            Self::Execute,
            Self::Delegate,
            Self::Validate,
        ]
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Execute => write!(f, "execute"),
            Self::Delegate => write!(f, "delegate"),
            Self::Validate => write!(f, "validate"),
        }
    }
}

/// Exact tool-name → category table (lowercased names).
const EXACT_CATEGORIES: &[(&str, ToolCategory)] = &[
    ("read", ToolCategory::Read),
    ("glob", ToolCategory::Read),
    ("grep", ToolCategory::Read),
    ("ls", ToolCategory::Read),
    ("webfetch", ToolCategory::Read),
    ("websearch", ToolCategory::Read),
    ("write", ToolCategory::Write),
    ("edit", ToolCategory::Write),
    ("multiedit", ToolCategory::Write),
    ("patch", ToolCategory::Write),
    ("bash", ToolCategory::Execute),
    ("shell", ToolCategory::Execute),
    ("task", ToolCategory::Delegate),
    ("agent", ToolCategory::Delegate),
    ("validate", ToolCategory::Validate),
    ("lint", ToolCategory::Validate),
];

/// Substring → category table, scanned in order. Earlier entries win, so
/// execute-ish fragments are listed before the broader validate fragments
/// ("run_tests" resolves to execute, not validate).
const SUBSTRING_CATEGORIES: &[(&str, ToolCategory)] = &[
    ("delegate", ToolCategory::Delegate),
    ("spawn", ToolCategory::Delegate),
    ("subagent", ToolCategory::Delegate),
    ("dispatch", ToolCategory::Delegate),
    ("exec", ToolCategory::Execute),
    ("run", ToolCategory::Execute),
    ("shell", ToolCategory::Execute),
    ("command", ToolCategory::Execute),
    ("bash", ToolCategory::Execute),
    ("write", ToolCategory::Write),
    ("edit", ToolCategory::Write),
    ("create_file", ToolCategory::Write),
    ("patch", ToolCategory::Write),
    ("validate", ToolCategory::Validate),
    ("verify", ToolCategory::Validate),
    ("check", ToolCategory::Validate),
    ("test", ToolCategory::Validate),
    ("lint", ToolCategory::Validate),
    ("read", ToolCategory::Read),
    ("search", ToolCategory::Read),
    ("fetch", ToolCategory::Read),
    ("list", ToolCategory::Read),
    ("find", ToolCategory::Read),
    ("grep", ToolCategory::Read),
    ("glob", ToolCategory::Read),
    ("view", ToolCategory::Read),
];

/// Resolve a tool name to its permission category.
///
/// Returns `None` for tools that match neither table. Matching is
/// case-insensitive.
#[must_use]
pub fn categorize_tool(tool_name: &str) -> Option<ToolCategory> {
    let lowered = tool_name.to_lowercase();

    for (name, category) in EXACT_CATEGORIES {
        if lowered == *name {
            return Some(*category);
        }
    }

    for (fragment, category) in SUBSTRING_CATEGORIES {
        if lowered.contains(fragment) {
            return Some(*category);
        }
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches() {
        assert_eq!(categorize_tool("read"), Some(ToolCategory::Read));
        assert_eq!(categorize_tool("write"), Some(ToolCategory::Write));
        assert_eq!(categorize_tool("bash"), Some(ToolCategory::Execute));
        assert_eq!(categorize_tool("task"), Some(ToolCategory::Delegate));
        assert_eq!(categorize_tool("lint"), Some(ToolCategory::Validate));
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        assert_eq!(categorize_tool("Read"), Some(ToolCategory::Read));
        assert_eq!(categorize_tool("BASH"), Some(ToolCategory::Execute));
        assert_eq!(categorize_tool("WebFetch"), Some(ToolCategory::Read));
    }

    #[test]
    fn substring_fallback() {
        assert_eq!(categorize_tool("notebook_edit"), Some(ToolCategory::Write));
        assert_eq!(categorize_tool("file_search"), Some(ToolCategory::Read));
        assert_eq!(
            categorize_tool("spawn_subagent"),
            Some(ToolCategory::Delegate)
        );
        assert_eq!(categorize_tool("verify_output"), Some(ToolCategory::Validate));
    }

    #[test]
    fn substring_order_execute_beats_validate() {
        // Contains both "run" and "test"; execute entries come first.
        assert_eq!(categorize_tool("run_tests"), Some(ToolCategory::Execute));
    }

    #[test]
    fn substring_order_delegate_beats_execute() {
        // Contains both "dispatch" and "exec"; delegate entries come first.
        assert_eq!(
            categorize_tool("dispatch_executor"),
            Some(ToolCategory::Delegate)
        );
    }

    #[test]
    fn unknown_tool_is_uncategorized() {
        assert_eq!(categorize_tool("frobnicate"), None);
        assert_eq!(categorize_tool(""), None);
        assert_eq!(categorize_tool("mcp__weather"), None);
    }

    #[test]
    fn all_returns_five_variants() {
        assert_eq!(ToolCategory::all().len(), 5);
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ToolCategory::Execute).unwrap(),
            "\"execute\""
        );
        let back: ToolCategory = serde_json::from_str("\"delegate\"").unwrap();
        assert_eq!(back, ToolCategory::Delegate);
    }

    #[test]
    fn display_matches_serde() {
        for category in ToolCategory::all() {
            let shown = category.to_string();
            let json = serde_json::to_string(category).unwrap();
            assert_eq!(json, format!("\"{shown}\""));
        }
    }
}
