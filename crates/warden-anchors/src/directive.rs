//! The compaction directive.
//!
//! When the host compacts its context, the engine injects a bounded block
//! of governance text: a reminder of how to behave after compaction, the
//! current phase and session, and one line per surviving anchor. The
//! whole block is hard-truncated to a fixed character budget — rendering
//! must never fail the compaction, so every internal problem degrades to
//! "inject nothing".

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::select::select_anchors;
use crate::types::Anchor;

/// Default number of anchors injected at compaction.
pub const DEFAULT_ANCHOR_BUDGET: usize = 5;

/// Character ceiling for the rendered directive.
pub const DIRECTIVE_CHAR_BUDGET: usize = 2000;

/// Marker appended when the directive was cut at the ceiling.
pub const TRUNCATION_MARKER: &str = "\n[directive truncated]";

const GOVERNANCE_REMINDER: &str = "GOVERNANCE: context was compacted. Before acting on new \
requests, check the anchors below. If a request conflicts with an anchor, flag the conflict \
instead of silently complying.";

/// Inputs for one directive rendering.
#[derive(Debug, Clone)]
pub struct DirectiveInput<'a> {
    /// All anchors currently in the store.
    pub anchors: &'a [Anchor],
    /// How many anchors may survive.
    pub budget: usize,
    /// Current phase label, when the session document carries one.
    pub phase: Option<&'a str>,
    /// Session the compaction fires in.
    pub session_id: &'a str,
}

/// Build the directive to inject after compaction.
///
/// Returns `None` when rendering fails for any reason — compaction then
/// proceeds with no injected context, which is always preferable to
/// failing the session.
#[must_use]
pub fn build_directive(input: &DirectiveInput<'_>, now: DateTime<Utc>) -> Option<String> {
    match render(input, now) {
        Ok(directive) => Some(directive),
        Err(message) => {
            error!(message, "directive rendering failed, compacting without governance context");
            None
        }
    }
}

fn render(input: &DirectiveInput<'_>, now: DateTime<Utc>) -> Result<String, &'static str> {
    let selected = select_anchors(input.anchors, input.budget, now);

    let mut directive = String::from(GOVERNANCE_REMINDER);
    directive.push_str("\n\n");
    match input.phase {
        Some(phase) => {
            directive.push_str(&format!(
                "Phase: {phase} | Session: {}\n",
                input.session_id
            ));
        }
        None => directive.push_str(&format!("Session: {}\n", input.session_id)),
    }

    if selected.is_empty() {
        directive.push_str("No anchors recorded.\n");
    } else {
        directive.push_str("Anchors:\n");
        for anchor in &selected {
            directive.push_str(&format!(
                "[{}/{}] {}\n",
                anchor.priority.to_string().to_uppercase(),
                anchor.kind,
                anchor.content
            ));
        }
    }

    Ok(truncate_directive(directive))
}

/// Hard-truncate to [`DIRECTIVE_CHAR_BUDGET`] characters, appending the
/// truncation marker. Never panics; logs a warning when it cuts.
fn truncate_directive(directive: String) -> String {
    let total = directive.chars().count();
    if total <= DIRECTIVE_CHAR_BUDGET {
        return directive;
    }
    warn!(
        chars = total,
        budget = DIRECTIVE_CHAR_BUDGET,
        "compaction directive truncated"
    );
    let keep = DIRECTIVE_CHAR_BUDGET.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut cut: String = directive.chars().take(keep).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
