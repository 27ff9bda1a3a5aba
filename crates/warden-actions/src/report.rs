//! Report assembly.
//!
//! Every action reply is plain text read directly by the calling agent.
//! Reports always end with the governance footer; staleness and
//! chain-break warnings are appended before it when present.

use chrono::{DateTime, Utc};
use warden_tasks::{GovernanceState, chain_breaks, stale_tasks};

/// Reminder closing every action report.
pub const GOVERNANCE_FOOTER: &str =
    "-- warden: writes require an active task; complete tasks with evidence.";

/// Assemble a full report: body lines, active warnings, footer.
#[must_use]
pub fn render(lines: &[String], state: &GovernanceState, now: DateTime<Utc>) -> String {
    let mut out: Vec<String> = lines.to_vec();

    let stale = stale_tasks(state, now);
    let breaks = chain_breaks(state);
    if !stale.is_empty() || !breaks.is_empty() {
        out.push(String::new());
        for warning in &stale {
            out.push(format!("WARNING: {warning}"));
        }
        for chain_break in &breaks {
            out.push(format!("WARNING: {chain_break}"));
        }
    }

    out.push(String::new());
    out.push(GOVERNANCE_FOOTER.to_owned());
    out.join("\n")
}

/// Assemble an instruction reply for rejected input.
///
/// Rejections are read by the calling agent, so they carry a corrected
/// example command instead of an error code. The footer still closes the
/// reply.
#[must_use]
pub fn render_instruction(problem: &str, example: &str) -> String {
    format!("{problem}\nExample: {example}\n\n{GOVERNANCE_FOOTER}")
}
