//! # warden-tasks
//!
//! The unit-of-work ledger: an epic → task → subtask hierarchy with a
//! status state machine, plus the delegation protocol that hands tasks
//! between agent roles.
//!
//! All operations are snapshot-in/snapshot-out over [`GovernanceState`]:
//! callers read the persisted snapshot, apply an operation, and persist
//! the whole document back. Rejections are structured errors, surfaced
//! side effects ride along in an [`Outcome`], and two read-only scans
//! ([`stale_tasks`], [`chain_breaks`]) provide the warnings appended to
//! every action report.

#![deny(unsafe_code)]

pub mod delegation;
pub mod errors;
pub mod hierarchy;
pub mod types;
pub mod warnings;

pub use delegation::{
    DELEGATION_EXPIRY_MINUTES, Handoff, MAX_DELEGATION_DEPTH, accept_delegation, chain_depth,
    compatible_roles, complete_delegation, delegate, handoff_instructions, reject_delegation,
    sweep_expired,
};
pub use errors::{DelegationError, TaskError};
pub use hierarchy::{
    Outcome, SideEffect, TaskUpdate, abandon_epic, add_subtask, assign, branch_task,
    complete_epic, complete_subtask, complete_task, create_epic, create_task, defer_epic,
    defer_subtask, defer_task, start_task, update_task,
};
pub use types::{
    Delegation, DelegationStatus, Epic, EpicCategory, EpicStatus, GovernanceLevel,
    GovernanceState, SCHEMA_VERSION, Subtask, SubtaskStatus, TASK_STALE_MINUTES, Task, TaskStatus,
};
pub use warnings::{ChainBreak, StaleTaskWarning, chain_breaks, stale_tasks};
