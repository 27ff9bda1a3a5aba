//! # warden-actions
//!
//! The agent-facing callable surface: the ledger action (epics, tasks,
//! subtasks, delegation) and the anchor action (context-preservation
//! facts), both speaking flat JSON argument bags in and plain text
//! reports out.
//!
//! Replies are written for the calling agent, not for a programmer:
//! rejected input comes back as an instruction with a corrected example
//! command, active warnings ride along on every report, and everything
//! closes with the governance footer.

#![deny(unsafe_code)]

pub mod action;
pub mod anchor;
pub mod ledger;
pub mod report;

pub use action::WardenAction;
pub use anchor::{AnchorAction, VALID_ANCHOR_ACTIONS};
pub use ledger::{LedgerAction, VALID_LEDGER_ACTIONS};
pub use report::{GOVERNANCE_FOOTER, render, render_instruction};
