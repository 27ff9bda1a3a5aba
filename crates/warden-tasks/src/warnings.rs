//! Non-fatal hierarchy diagnostics.
//!
//! Two read-only scans run alongside every action report: stale-task
//! detection (an active task nobody has touched in a while) and
//! chain-break detection (structural anomalies in the hierarchy). Both
//! warn; neither blocks.

use chrono::{DateTime, Utc};
use warden_core::{DelegationId, EpicId, TaskId};

use crate::types::{EpicStatus, GovernanceState, TaskStatus, TASK_STALE_MINUTES};

/// An active task that has gone quiet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleTaskWarning {
    /// The stale task.
    pub task_id: TaskId,
    /// Its name.
    pub name: String,
    /// Minutes since the task was last modified.
    pub idle_minutes: i64,
}

impl std::fmt::Display for StaleTaskWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "task \"{}\" has been active but untouched for {} minutes. \
             Add a subtask, complete it with evidence, or defer it with a reason.",
            self.name, self.idle_minutes
        )
    }
}

/// Active tasks whose `modified_at` is older than the stale threshold.
#[must_use]
pub fn stale_tasks(state: &GovernanceState, now: DateTime<Utc>) -> Vec<StaleTaskWarning> {
    state
        .epics
        .iter()
        .flat_map(|epic| epic.tasks.iter())
        .filter(|task| task.status == TaskStatus::Active)
        .filter_map(|task| {
            let idle_minutes = task.stamp.minutes_since_modified(now);
            (idle_minutes > TASK_STALE_MINUTES).then(|| StaleTaskWarning {
                task_id: task.id.clone(),
                name: task.name.clone(),
                idle_minutes,
            })
        })
        .collect()
}

/// A structural anomaly in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainBreak {
    /// A task references a delegation id that does not resolve.
    UnresolvedDelegation {
        /// The referencing task.
        task_id: TaskId,
        /// The dangling id.
        delegation_id: DelegationId,
    },
    /// An epic is marked active but holds no tasks.
    ActiveEpicWithoutTasks {
        /// The empty epic.
        epic_id: EpicId,
        /// Its name.
        name: String,
    },
    /// A task is still linked to a delegation that already ended.
    LinkedToTerminalDelegation {
        /// The linked task.
        task_id: TaskId,
        /// The terminal delegation.
        delegation_id: DelegationId,
    },
}

impl std::fmt::Display for ChainBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedDelegation {
                task_id,
                delegation_id,
            } => write!(
                f,
                "task {task_id} references delegation {delegation_id}, which does not exist"
            ),
            Self::ActiveEpicWithoutTasks { name, .. } => {
                write!(f, "epic \"{name}\" is active but has no tasks")
            }
            Self::LinkedToTerminalDelegation {
                task_id,
                delegation_id,
            } => write!(
                f,
                "task {task_id} is still linked to ended delegation {delegation_id}"
            ),
        }
    }
}

/// Read-only scan for structural anomalies. Never mutates, never fails.
#[must_use]
pub fn chain_breaks(state: &GovernanceState) -> Vec<ChainBreak> {
    let mut breaks = Vec::new();

    for epic in &state.epics {
        if epic.status == EpicStatus::Active && epic.tasks.is_empty() {
            breaks.push(ChainBreak::ActiveEpicWithoutTasks {
                epic_id: epic.id.clone(),
                name: epic.name.clone(),
            });
        }
        for task in &epic.tasks {
            let Some(delegation_id) = &task.delegation_id else {
                continue;
            };
            match state.delegation(delegation_id) {
                None => breaks.push(ChainBreak::UnresolvedDelegation {
                    task_id: task.id.clone(),
                    delegation_id: delegation_id.clone(),
                }),
                Some(delegation) if !delegation.status.is_open() => {
                    breaks.push(ChainBreak::LinkedToTerminalDelegation {
                        task_id: task.id.clone(),
                        delegation_id: delegation_id.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    breaks
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
