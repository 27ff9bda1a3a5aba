//! Hierarchy and delegation types.
//!
//! The three-level unit-of-work hierarchy (epic → task → subtask), the
//! delegation record, and the [`GovernanceState`] snapshot document that
//! holds all of them. All wire types use `camelCase` serde renaming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{DelegationId, EpicId, Stamp, SubtaskId, TaskId};
use warden_policy::AgentRole;

/// Schema version written into every persisted state document.
pub const SCHEMA_VERSION: u32 = 1;

/// Minutes of inactivity after which an active task is surfaced as stale.
pub const TASK_STALE_MINUTES: i64 = 120;

/// Category of work an epic represents. Drives delegation routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EpicCategory {
    /// Feature and fix work.
    Development,
    /// Investigation and analysis.
    Research,
    /// Process and policy work.
    Governance,
    /// Upkeep, refactors, dependency bumps.
    Maintenance,
    /// Specification-driven work.
    SpecKit,
    /// Anything that fits nowhere else.
    AdHoc,
}

impl std::fmt::Display for EpicCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Research => write!(f, "research"),
            Self::Governance => write!(f, "governance"),
            Self::Maintenance => write!(f, "maintenance"),
            Self::SpecKit => write!(f, "spec-kit"),
            Self::AdHoc => write!(f, "ad-hoc"),
        }
    }
}

/// How much process ceremony an epic carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernanceLevel {
    /// Minimal ceremony.
    Light,
    /// Evidence required on completion.
    #[default]
    Standard,
    /// Evidence plus validation handoff expected.
    Strict,
}

/// Epic lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpicStatus {
    /// Created but not the current focus.
    Draft,
    /// The epic work is happening under.
    Active,
    /// All tasks resolved.
    Completed,
    /// Parked with a recorded reason.
    Archived,
    /// Given up on.
    Abandoned,
}

impl EpicStatus {
    /// Whether this status ends the epic's lifecycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Archived | Self::Abandoned)
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Queued, not started.
    Planned,
    /// Being worked right now. At most one per epic.
    Active,
    /// Awaiting review. Reachable via update only; reserved.
    Review,
    /// Finished with evidence.
    Completed,
    /// Did not work out.
    Failed,
    /// Parked with a recorded reason.
    Deferred,
}

impl TaskStatus {
    /// Whether this status ends the task's lifecycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Deferred)
    }
}

/// Subtask lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtaskStatus {
    /// Not yet done.
    Pending,
    /// Done.
    Done,
    /// Deliberately not done.
    Skipped,
}

impl SubtaskStatus {
    /// Whether the subtask no longer blocks task completion.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

/// Delegation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationStatus {
    /// Offered, not yet picked up.
    Pending,
    /// Picked up by the target agent.
    Accepted,
    /// Finished by the target agent.
    Completed,
    /// Declined by the target agent.
    Rejected,
    /// Expired unanswered. Set lazily by the expiry sweep.
    Expired,
}

impl DelegationStatus {
    /// Whether this delegation still occupies its task.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// Whether this delegation counts toward chain depth.
    ///
    /// Expired and rejected handoffs free the task and consume no depth.
    #[must_use]
    pub fn consumes_depth(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted | Self::Completed)
    }
}

impl std::fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Completed => write!(f, "completed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Leaf checklist item under a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Unique id.
    pub id: SubtaskId,
    /// Owning task.
    pub task_id: TaskId,
    /// What needs doing.
    pub name: String,
    /// Current status.
    pub status: SubtaskStatus,
    /// Tool that resolved the subtask, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_used: Option<String>,
    /// Timestamps.
    pub stamp: Stamp,
}

/// Actionable unit of work inside an epic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique id.
    pub id: TaskId,
    /// Owning epic.
    pub epic_id: EpicId,
    /// What the task is.
    pub name: String,
    /// Current status.
    pub status: TaskStatus,
    /// Agent name the task is assigned to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Evidence recorded on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Reason recorded when deferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defer_reason: Option<String>,
    /// Task this one was branched from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branched_from: Option<TaskId>,
    /// Role the task is currently delegated to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegated_to: Option<AgentRole>,
    /// The delegation occupying this task, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegation_id: Option<DelegationId>,
    /// Checklist items.
    pub subtasks: Vec<Subtask>,
    /// Timestamps.
    pub stamp: Stamp,
}

impl Task {
    /// Names of subtasks that still block completion.
    #[must_use]
    pub fn pending_subtasks(&self) -> Vec<String> {
        self.subtasks
            .iter()
            .filter(|subtask| !subtask.status.is_resolved())
            .map(|subtask| subtask.name.clone())
            .collect()
    }
}

/// Top-level unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epic {
    /// Unique id.
    pub id: EpicId,
    /// What the epic is.
    pub name: String,
    /// Category of work; drives delegation routing.
    pub category: EpicCategory,
    /// How much ceremony the epic carries.
    pub governance_level: GovernanceLevel,
    /// Current status.
    pub status: EpicStatus,
    /// Reason recorded when deferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defer_reason: Option<String>,
    /// Tasks under this epic.
    pub tasks: Vec<Task>,
    /// Timestamps.
    pub stamp: Stamp,
}

impl Epic {
    /// The currently active task in this epic, if any.
    #[must_use]
    pub fn active_task(&self) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|task| task.status == TaskStatus::Active)
    }
}

/// A tracked handoff of one task from one agent role to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    /// Unique id.
    pub id: DelegationId,
    /// Role handing the work off.
    pub from_agent: AgentRole,
    /// Role receiving the work.
    pub to_agent: AgentRole,
    /// Task being handed off.
    pub task_id: TaskId,
    /// What the target needs to know.
    pub context: String,
    /// What the target is expected to produce.
    pub expected_output: String,
    /// Position in the delegation chain, starting at 1.
    pub depth: u32,
    /// When the handoff was created.
    pub created_at: DateTime<Utc>,
    /// When an unanswered handoff lapses.
    pub expires_at: DateTime<Utc>,
    /// Current status.
    pub status: DelegationStatus,
}

/// The whole persisted governance snapshot.
///
/// Mutations are whole-object replace-on-write: read a snapshot, apply an
/// operation, persist the result atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceState {
    /// Document schema version.
    pub schema_version: u32,
    /// The single epic work currently happens under, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_epic_id: Option<EpicId>,
    /// The task currently unlocking write access, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_task_id: Option<TaskId>,
    /// All epics, oldest first.
    pub epics: Vec<Epic>,
    /// All delegations ever recorded, oldest first.
    pub delegations: Vec<Delegation>,
}

impl Default for GovernanceState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            active_epic_id: None,
            active_task_id: None,
            epics: Vec::new(),
            delegations: Vec::new(),
        }
    }
}

impl GovernanceState {
    /// Look up an epic by id.
    #[must_use]
    pub fn epic(&self, id: &EpicId) -> Option<&Epic> {
        self.epics.iter().find(|epic| &epic.id == id)
    }

    /// Look up an epic by id, mutably.
    pub fn epic_mut(&mut self, id: &EpicId) -> Option<&mut Epic> {
        self.epics.iter_mut().find(|epic| &epic.id == id)
    }

    /// The epic pointed to by `active_epic_id`, if any.
    #[must_use]
    pub fn active_epic(&self) -> Option<&Epic> {
        self.active_epic_id.as_ref().and_then(|id| self.epic(id))
    }

    /// Find a task anywhere in the hierarchy.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.epics
            .iter()
            .flat_map(|epic| epic.tasks.iter())
            .find(|task| &task.id == id)
    }

    /// Find a task anywhere in the hierarchy, mutably.
    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.epics
            .iter_mut()
            .flat_map(|epic| epic.tasks.iter_mut())
            .find(|task| &task.id == id)
    }

    /// Find a subtask anywhere in the hierarchy, mutably.
    pub fn subtask_mut(&mut self, id: &SubtaskId) -> Option<&mut Subtask> {
        self.epics
            .iter_mut()
            .flat_map(|epic| epic.tasks.iter_mut())
            .flat_map(|task| task.subtasks.iter_mut())
            .find(|subtask| &subtask.id == id)
    }

    /// Look up a delegation by id.
    #[must_use]
    pub fn delegation(&self, id: &DelegationId) -> Option<&Delegation> {
        self.delegations
            .iter()
            .find(|delegation| &delegation.id == id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
