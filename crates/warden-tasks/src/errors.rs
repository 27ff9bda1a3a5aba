//! Hierarchy and delegation error types.
//!
//! Every rejection names the violated invariant and the blocking items so
//! the actions layer can render an instruction the calling agent can act
//! on. None of these are panics; a failed operation leaves the snapshot it
//! was given unchanged.

use thiserror::Error;
use warden_policy::AgentRole;

use crate::types::EpicCategory;

/// Errors from hierarchy operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// Entity lookup failed.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type ("Epic", "Task", "Subtask").
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// An operation that needs an epic ran with none active.
    #[error("no active epic; create one first")]
    NoActiveEpic,

    /// Completion attempted without evidence.
    #[error("task \"{name}\" cannot complete without evidence")]
    EvidenceMissing {
        /// The task that was not completed.
        id: String,
        /// Its name, for the report.
        name: String,
    },

    /// Completion attempted while subtasks are unresolved.
    #[error("task \"{name}\" has pending subtasks: {}", pending.join(", "))]
    SubtasksPending {
        /// The task that was not completed.
        id: String,
        /// Its name, for the report.
        name: String,
        /// Names of subtasks still pending.
        pending: Vec<String>,
    },

    /// Epic completion attempted while tasks are unresolved.
    #[error("epic \"{name}\" has unresolved tasks: {}", blockers.join(", "))]
    EpicBlocked {
        /// The epic that was not completed.
        id: String,
        /// Its name, for the report.
        name: String,
        /// `"name (status)"` for each blocking task.
        blockers: Vec<String>,
    },

    /// A transition the state machine does not permit.
    #[error("{entity} \"{name}\" cannot move from {from} to {to}")]
    InvalidTransition {
        /// Entity type.
        entity: &'static str,
        /// Entity name.
        name: String,
        /// Status it is in.
        from: String,
        /// Status that was requested.
        to: String,
    },

    /// Malformed or missing arguments.
    #[error("validation error: {0}")]
    Validation(String),
}

impl TaskError {
    /// Not-found error for an epic.
    #[must_use]
    pub fn epic_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Epic",
            id: id.into(),
        }
    }

    /// Not-found error for a task.
    #[must_use]
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Task",
            id: id.into(),
        }
    }

    /// Not-found error for a subtask.
    #[must_use]
    pub fn subtask_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Subtask",
            id: id.into(),
        }
    }
}

/// Errors from the delegation protocol.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DelegationError {
    /// The task does not exist.
    #[error("task not found: {id}")]
    TaskNotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The task already carries an open handoff.
    #[error("task {task_id} already has an open delegation ({delegation_id})")]
    AlreadyDelegated {
        /// Task with the existing handoff.
        task_id: String,
        /// The open delegation occupying it.
        delegation_id: String,
    },

    /// Another hop would exceed the chain limit.
    #[error("delegation depth {attempted} exceeds the maximum of {max} for task {task_id}")]
    DepthExceeded {
        /// Task whose chain is full.
        task_id: String,
        /// Depth the new hop would have.
        attempted: u32,
        /// The fixed maximum.
        max: u32,
    },

    /// The routing table does not permit this handoff.
    #[error("{from} ({from_tier} tier) may not delegate to {to} ({to_tier} tier)")]
    RouteNotAllowed {
        /// Delegating role.
        from: AgentRole,
        /// Its tier, for the report.
        from_tier: String,
        /// Target role.
        to: AgentRole,
        /// Its tier, for the report.
        to_tier: String,
    },

    /// The target role is incompatible with the epic's category.
    #[error("{category} epics do not route to {to} agents (allowed: {})", allowed.join(", "))]
    CategoryIncompatible {
        /// Category of the owning epic.
        category: EpicCategory,
        /// The rejected target role.
        to: AgentRole,
        /// Roles the category does route to.
        allowed: Vec<String>,
    },

    /// A status change the delegation lifecycle does not permit.
    #[error("delegation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The delegation.
        id: String,
        /// Status it is in.
        from: String,
        /// Status that was requested.
        to: String,
    },

    /// The delegation does not exist.
    #[error("delegation not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
}
