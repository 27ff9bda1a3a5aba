//! Hierarchy state machine operations.
//!
//! Every operation takes a mutable [`GovernanceState`] snapshot, validates
//! first, then mutates. A rejected operation leaves the snapshot untouched,
//! so callers can always persist whatever they hold. Side effects an
//! operation applies beyond its target (demoting a previously active task,
//! clearing the active pointer) are surfaced in the returned [`Outcome`]
//! rather than applied silently.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use warden_core::{EpicId, Stamp, SubtaskId, TaskId};

use crate::errors::TaskError;
use crate::types::{
    Epic, EpicCategory, EpicStatus, GovernanceLevel, GovernanceState, Subtask, SubtaskStatus,
    Task, TaskStatus,
};

/// A change an operation applied beyond its direct target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// The previously pointed-to epic was reverted to draft.
    EpicDemoted {
        /// The demoted epic.
        epic_id: EpicId,
        /// Its name, for the report.
        name: String,
    },
    /// The previously active task in the epic was reverted to planned.
    TaskDemoted {
        /// The demoted task.
        task_id: TaskId,
        /// Its name, for the report.
        name: String,
    },
    /// An active task was force-deferred by an epic-level defer.
    TaskDeferred {
        /// The deferred task.
        task_id: TaskId,
        /// Its name, for the report.
        name: String,
    },
    /// The active-task pointer was cleared; writes are locked again.
    ActiveTaskCleared,
    /// The active-epic pointer was cleared.
    ActiveEpicCleared,
}

impl std::fmt::Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EpicDemoted { name, .. } => {
                write!(f, "previous epic \"{name}\" reverted to draft")
            }
            Self::TaskDemoted { name, .. } => {
                write!(f, "previous task \"{name}\" reverted to planned")
            }
            Self::TaskDeferred { name, .. } => {
                write!(f, "active task \"{name}\" deferred with the epic")
            }
            Self::ActiveTaskCleared => {
                write!(f, "active task cleared; write access locked until a task starts")
            }
            Self::ActiveEpicCleared => write!(f, "active epic cleared"),
        }
    }
}

/// What an operation did: report lines plus surfaced side effects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    /// Human-readable report lines, in order.
    pub report: Vec<String>,
    /// Side effects beyond the direct target.
    pub side_effects: Vec<SideEffect>,
}

impl Outcome {
    fn line(mut self, line: impl Into<String>) -> Self {
        self.report.push(line.into());
        self
    }

    fn effect(mut self, effect: SideEffect) -> Self {
        self.report.push(effect.to_string());
        self.side_effects.push(effect);
        self
    }
}

/// Create an epic and make it the active one.
///
/// A previously pointed-to epic is reverted to draft and the demotion is
/// surfaced, mirroring what starting a task does to its sibling.
pub fn create_epic(
    state: &mut GovernanceState,
    name: &str,
    category: EpicCategory,
    governance_level: GovernanceLevel,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if name.trim().is_empty() {
        return Err(TaskError::Validation("epic name must not be empty".into()));
    }

    let mut outcome = Outcome::default();
    if let Some(previous_id) = state.active_epic_id.clone() {
        if let Some(previous) = state.epic_mut(&previous_id) {
            previous.status = EpicStatus::Draft;
            previous.stamp.touch(now);
            outcome = outcome.effect(SideEffect::EpicDemoted {
                epic_id: previous.id.clone(),
                name: previous.name.clone(),
            });
        }
    }

    let epic = Epic {
        id: EpicId::new(),
        name: name.trim().to_owned(),
        category,
        governance_level,
        status: EpicStatus::Active,
        defer_reason: None,
        tasks: Vec::new(),
        stamp: Stamp::at(now),
    };
    info!(epic_id = %epic.id, name, %category, "epic created");
    outcome = outcome.line(format!("Epic \"{name}\" created ({category}) and set active."));
    outcome = outcome.line(format!("Epic id: {}", epic.id));
    state.active_epic_id = Some(epic.id.clone());
    state.epics.push(epic);
    Ok(outcome)
}

/// Create a planned task under the given epic, or the active one.
pub fn create_task(
    state: &mut GovernanceState,
    epic_id: Option<&EpicId>,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if name.trim().is_empty() {
        return Err(TaskError::Validation("task name must not be empty".into()));
    }
    let epic_id = match epic_id {
        Some(id) => {
            if state.epic(id).is_none() {
                return Err(TaskError::epic_not_found(id.as_str()));
            }
            id.clone()
        }
        None => state.active_epic_id.clone().ok_or(TaskError::NoActiveEpic)?,
    };

    let task = Task {
        id: TaskId::new(),
        epic_id: epic_id.clone(),
        name: name.trim().to_owned(),
        status: TaskStatus::Planned,
        assignee: None,
        evidence: None,
        defer_reason: None,
        branched_from: None,
        delegated_to: None,
        delegation_id: None,
        subtasks: Vec::new(),
        stamp: Stamp::at(now),
    };
    let task_id = task.id.clone();
    let epic = state
        .epic_mut(&epic_id)
        .ok_or_else(|| TaskError::epic_not_found(epic_id.as_str()))?;
    epic.tasks.push(task);
    epic.stamp.touch(now);
    debug!(%task_id, epic_id = %epic_id, name, "task created");
    Ok(Outcome::default()
        .line(format!("Task \"{}\" created (planned).", name.trim()))
        .line(format!("Task id: {task_id}")))
}

/// Add a pending subtask to a task.
pub fn add_subtask(
    state: &mut GovernanceState,
    task_id: &TaskId,
    name: &str,
    tool_used: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if name.trim().is_empty() {
        return Err(TaskError::Validation(
            "subtask name must not be empty".into(),
        ));
    }
    let task = state
        .task_mut(task_id)
        .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
    let subtask = Subtask {
        id: SubtaskId::new(),
        task_id: task_id.clone(),
        name: name.trim().to_owned(),
        status: SubtaskStatus::Pending,
        tool_used: tool_used.map(str::to_owned),
        stamp: Stamp::at(now),
    };
    let subtask_id = subtask.id.clone();
    task.subtasks.push(subtask);
    task.stamp.touch(now);
    Ok(Outcome::default()
        .line(format!(
            "Subtask \"{}\" added to \"{}\".",
            name.trim(),
            task.name
        ))
        .line(format!("Subtask id: {subtask_id}")))
}

/// Mark a subtask done.
pub fn complete_subtask(
    state: &mut GovernanceState,
    subtask_id: &SubtaskId,
    tool_used: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    let subtask = state
        .subtask_mut(subtask_id)
        .ok_or_else(|| TaskError::subtask_not_found(subtask_id.as_str()))?;
    subtask.status = SubtaskStatus::Done;
    if tool_used.is_some() {
        subtask.tool_used = tool_used.map(str::to_owned);
    }
    subtask.stamp.touch(now);
    let name = subtask.name.clone();
    Ok(Outcome::default().line(format!("Subtask \"{name}\" marked done.")))
}

/// Assign a task to an agent.
pub fn assign(
    state: &mut GovernanceState,
    task_id: &TaskId,
    assignee: &str,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if assignee.trim().is_empty() {
        return Err(TaskError::Validation("assignee must not be empty".into()));
    }
    let task = state
        .task_mut(task_id)
        .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
    task.assignee = Some(assignee.trim().to_owned());
    task.stamp.touch(now);
    Ok(Outcome::default().line(format!(
        "Task \"{}\" assigned to {}.",
        task.name,
        assignee.trim()
    )))
}

/// Set a task active, demoting any currently active sibling to planned.
///
/// Sets the active-task pointer, which unlocks write-category tools.
pub fn start_task(
    state: &mut GovernanceState,
    task_id: &TaskId,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    let (epic_id, task_name, status) = {
        let task = state
            .task(task_id)
            .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
        (task.epic_id.clone(), task.name.clone(), task.status)
    };
    if status.is_terminal() {
        return Err(TaskError::InvalidTransition {
            entity: "Task",
            name: task_name,
            from: format!("{status:?}").to_lowercase(),
            to: "active".to_owned(),
        });
    }

    let mut outcome = Outcome::default();
    let epic = state
        .epic_mut(&epic_id)
        .ok_or_else(|| TaskError::epic_not_found(epic_id.as_str()))?;
    for sibling in &mut epic.tasks {
        if sibling.status == TaskStatus::Active && &sibling.id != task_id {
            sibling.status = TaskStatus::Planned;
            sibling.stamp.touch(now);
            outcome = outcome.effect(SideEffect::TaskDemoted {
                task_id: sibling.id.clone(),
                name: sibling.name.clone(),
            });
        }
    }

    let task = state
        .task_mut(task_id)
        .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
    task.status = TaskStatus::Active;
    task.stamp.touch(now);
    state.active_task_id = Some(task_id.clone());
    info!(%task_id, "task started");
    Ok(outcome.line(format!(
        "Task \"{task_name}\" is now active. Write access unlocked."
    )))
}

/// Complete a task.
///
/// Rejected while any subtask is unresolved or when evidence is missing.
/// On success the active-task pointer is cleared, re-locking write access
/// until another task starts.
pub fn complete_task(
    state: &mut GovernanceState,
    task_id: &TaskId,
    evidence: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    // Validate everything before touching the snapshot.
    let (name, pending) = {
        let task = state
            .task(task_id)
            .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
        (task.name.clone(), task.pending_subtasks())
    };
    if !pending.is_empty() {
        return Err(TaskError::SubtasksPending {
            id: task_id.to_string(),
            name,
            pending,
        });
    }
    let evidence = match evidence.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => {
            return Err(TaskError::EvidenceMissing {
                id: task_id.to_string(),
                name,
            });
        }
    };

    let task = state
        .task_mut(task_id)
        .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
    task.status = TaskStatus::Completed;
    task.evidence = Some(evidence);
    task.stamp.touch(now);
    info!(%task_id, "task completed");

    let mut outcome = Outcome::default().line(format!("Task \"{name}\" completed."));
    if state.active_task_id.as_ref() == Some(task_id) {
        state.active_task_id = None;
        outcome = outcome.effect(SideEffect::ActiveTaskCleared);
    }
    Ok(outcome)
}

/// Complete an epic.
///
/// Rejected while any task is outside `{completed, deferred}`; the
/// rejection lists every blocking task.
pub fn complete_epic(
    state: &mut GovernanceState,
    epic_id: &EpicId,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    let (name, blockers) = {
        let epic = state
            .epic(epic_id)
            .ok_or_else(|| TaskError::epic_not_found(epic_id.as_str()))?;
        let blockers: Vec<String> = epic
            .tasks
            .iter()
            .filter(|task| {
                !matches!(task.status, TaskStatus::Completed | TaskStatus::Deferred)
            })
            .map(|task| {
                format!("{} ({})", task.name, format!("{:?}", task.status).to_lowercase())
            })
            .collect();
        (epic.name.clone(), blockers)
    };
    if !blockers.is_empty() {
        return Err(TaskError::EpicBlocked {
            id: epic_id.to_string(),
            name,
            blockers,
        });
    }

    let epic = state
        .epic_mut(epic_id)
        .ok_or_else(|| TaskError::epic_not_found(epic_id.as_str()))?;
    epic.status = EpicStatus::Completed;
    epic.stamp.touch(now);
    info!(%epic_id, "epic completed");

    let mut outcome = Outcome::default().line(format!("Epic \"{name}\" completed."));
    if state.active_epic_id.as_ref() == Some(epic_id) {
        state.active_epic_id = None;
        outcome = outcome.effect(SideEffect::ActiveEpicCleared);
    }
    Ok(outcome)
}

/// Defer a task with a reason.
pub fn defer_task(
    state: &mut GovernanceState,
    task_id: &TaskId,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if reason.trim().is_empty() {
        return Err(TaskError::Validation(
            "a defer reason must be supplied".into(),
        ));
    }
    let task = state
        .task_mut(task_id)
        .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
    task.status = TaskStatus::Deferred;
    task.defer_reason = Some(reason.trim().to_owned());
    task.stamp.touch(now);
    let name = task.name.clone();

    let mut outcome =
        Outcome::default().line(format!("Task \"{name}\" deferred: {}", reason.trim()));
    if state.active_task_id.as_ref() == Some(task_id) {
        state.active_task_id = None;
        outcome = outcome.effect(SideEffect::ActiveTaskCleared);
    }
    Ok(outcome)
}

/// Defer a subtask, which marks it skipped (terminal).
pub fn defer_subtask(
    state: &mut GovernanceState,
    subtask_id: &SubtaskId,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    let subtask = state
        .subtask_mut(subtask_id)
        .ok_or_else(|| TaskError::subtask_not_found(subtask_id.as_str()))?;
    subtask.status = SubtaskStatus::Skipped;
    subtask.stamp.touch(now);
    let name = subtask.name.clone();
    Ok(Outcome::default().line(format!("Subtask \"{name}\" skipped.")))
}

/// Defer an epic with a reason.
///
/// The epic is archived and every active task under it is force-deferred
/// with an inherited reason; each forced defer is surfaced. Clears the
/// active pointers when they referenced this epic.
pub fn defer_epic(
    state: &mut GovernanceState,
    epic_id: &EpicId,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if reason.trim().is_empty() {
        return Err(TaskError::Validation(
            "a defer reason must be supplied".into(),
        ));
    }
    let reason = reason.trim().to_owned();
    let mut outcome = Outcome::default();
    let mut cleared_task = false;
    {
        let active_task_id = state.active_task_id.clone();
        let epic = state
            .epic_mut(epic_id)
            .ok_or_else(|| TaskError::epic_not_found(epic_id.as_str()))?;
        epic.status = EpicStatus::Archived;
        epic.defer_reason = Some(reason.clone());
        epic.stamp.touch(now);
        outcome = outcome.line(format!("Epic \"{}\" deferred: {reason}", epic.name));

        for task in &mut epic.tasks {
            if task.status == TaskStatus::Active {
                task.status = TaskStatus::Deferred;
                task.defer_reason = Some(format!("epic deferred: {reason}"));
                task.stamp.touch(now);
                if active_task_id.as_ref() == Some(&task.id) {
                    cleared_task = true;
                }
                outcome = outcome.effect(SideEffect::TaskDeferred {
                    task_id: task.id.clone(),
                    name: task.name.clone(),
                });
            }
        }
    }
    if cleared_task {
        state.active_task_id = None;
        outcome = outcome.effect(SideEffect::ActiveTaskCleared);
    }
    if state.active_epic_id.as_ref() == Some(epic_id) {
        state.active_epic_id = None;
        outcome = outcome.effect(SideEffect::ActiveEpicCleared);
    }
    Ok(outcome)
}

/// Abandon an epic. Tasks use defer instead.
pub fn abandon_epic(
    state: &mut GovernanceState,
    epic_id: &EpicId,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    let epic = state
        .epic_mut(epic_id)
        .ok_or_else(|| TaskError::epic_not_found(epic_id.as_str()))?;
    epic.status = EpicStatus::Abandoned;
    epic.stamp.touch(now);
    let name = epic.name.clone();

    let mut outcome = Outcome::default().line(format!("Epic \"{name}\" abandoned."));
    if state.active_epic_id.as_ref() == Some(epic_id) {
        state.active_epic_id = None;
        outcome = outcome.effect(SideEffect::ActiveEpicCleared);
    }
    Ok(outcome)
}

/// Fields `update_task` may change.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New name, if any.
    pub name: Option<String>,
    /// New assignee, if any.
    pub assignee: Option<String>,
    /// New status, if any. This is the only path into `review`.
    pub status: Option<TaskStatus>,
}

/// Update a task's name, assignee, or status.
///
/// Status changes through `update` bypass the start/complete machinery and
/// their invariants on purpose; it is the escape hatch the reserved
/// `review` status is reached through. Moving a task to `active` or
/// `completed` still goes through [`start_task`] and [`complete_task`].
pub fn update_task(
    state: &mut GovernanceState,
    task_id: &TaskId,
    update: &TaskUpdate,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if let Some(status) = update.status {
        if matches!(status, TaskStatus::Active | TaskStatus::Completed) {
            let name = state
                .task(task_id)
                .map(|task| task.name.clone())
                .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
            return Err(TaskError::InvalidTransition {
                entity: "Task",
                name,
                from: "update".to_owned(),
                to: format!("{status:?}").to_lowercase(),
            });
        }
    }
    let task = state
        .task_mut(task_id)
        .ok_or_else(|| TaskError::task_not_found(task_id.as_str()))?;
    let mut outcome = Outcome::default();
    if let Some(name) = &update.name {
        outcome = outcome.line(format!("Task renamed \"{}\" -> \"{name}\".", task.name));
        task.name = name.clone();
    }
    if let Some(assignee) = &update.assignee {
        task.assignee = Some(assignee.clone());
        outcome = outcome.line(format!("Task assigned to {assignee}."));
    }
    if let Some(status) = update.status {
        outcome = outcome.line(format!(
            "Task status set to {}.",
            format!("{status:?}").to_lowercase()
        ));
        task.status = status;
    }
    if outcome.report.is_empty() {
        return Err(TaskError::Validation(
            "update requires at least one of name, assignee, or status".into(),
        ));
    }
    task.stamp.touch(now);
    Ok(outcome)
}

/// Branch a new planned sibling task off an existing one.
///
/// Only the given name is carried; the new task records where it branched
/// from and nothing else is copied.
pub fn branch_task(
    state: &mut GovernanceState,
    from_task_id: &TaskId,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if name.trim().is_empty() {
        return Err(TaskError::Validation("task name must not be empty".into()));
    }
    let epic_id = state
        .task(from_task_id)
        .map(|task| task.epic_id.clone())
        .ok_or_else(|| TaskError::task_not_found(from_task_id.as_str()))?;

    let task = Task {
        id: TaskId::new(),
        epic_id: epic_id.clone(),
        name: name.trim().to_owned(),
        status: TaskStatus::Planned,
        assignee: None,
        evidence: None,
        defer_reason: None,
        branched_from: Some(from_task_id.clone()),
        delegated_to: None,
        delegation_id: None,
        subtasks: Vec::new(),
        stamp: Stamp::at(now),
    };
    let task_id = task.id.clone();
    let epic = state
        .epic_mut(&epic_id)
        .ok_or_else(|| TaskError::epic_not_found(epic_id.as_str()))?;
    epic.tasks.push(task);
    epic.stamp.touch(now);
    Ok(Outcome::default()
        .line(format!(
            "Task \"{}\" branched from {from_task_id} (planned).",
            name.trim()
        ))
        .line(format!("Task id: {task_id}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
