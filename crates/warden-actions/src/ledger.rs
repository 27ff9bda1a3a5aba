//! The ledger action: epic/task/subtask CRUD plus delegation.
//!
//! One flat argument bag in, one text report out. Thirteen routed
//! actions. Anything malformed comes back as an instruction with a
//! corrected example command, because the reply is read by the calling
//! agent, not by a programmer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;
use warden_core::{EpicId, SubtaskId, TaskId};
use warden_policy::detect_agent_role;
use warden_store::StateStore;
use warden_tasks::{
    EpicCategory, GovernanceLevel, GovernanceState, TaskStatus, TaskUpdate, abandon_epic,
    add_subtask, assign, branch_task, complete_epic, complete_subtask, complete_task, create_epic,
    create_task, defer_epic, defer_subtask, defer_task, delegate, start_task, sweep_expired,
    update_task,
};

use crate::action::WardenAction;
use crate::report::{render, render_instruction};

/// Actions the ledger routes.
pub const VALID_LEDGER_ACTIONS: &[&str] = &[
    "create_epic",
    "create_task",
    "add_subtask",
    "assign",
    "start",
    "complete",
    "defer",
    "abandon",
    "delegate",
    "status",
    "list",
    "update",
    "branch",
];

/// The ledger tool exposed to agents.
pub struct LedgerAction {
    store: Arc<StateStore>,
}

impl LedgerAction {
    /// Create the action over a shared store.
    #[must_use]
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WardenAction for LedgerAction {
    fn name(&self) -> &str {
        "ledger"
    }

    fn description(&self) -> &str {
        "Manage epics, tasks, subtasks, and delegations."
    }

    async fn execute(&self, args: Value, now: DateTime<Utc>) -> String {
        let Some(action) = args.get("action").and_then(Value::as_str) else {
            return render_instruction(
                &format!(
                    "the ledger needs an \"action\" field. Valid actions: {}.",
                    VALID_LEDGER_ACTIONS.join(", ")
                ),
                example_for("create_epic"),
            );
        };
        if !VALID_LEDGER_ACTIONS.contains(&action) {
            return render_instruction(
                &format!(
                    "\"{action}\" is not a ledger action. Valid actions: {}.",
                    VALID_LEDGER_ACTIONS.join(", ")
                ),
                example_for("create_epic"),
            );
        }

        let mut state = self.store.read_state();
        // Every ledger read runs the lazy expiry sweep, including the
        // read-only views; a swept snapshot is persisted even when the
        // routed action is later rejected.
        if sweep_expired(&mut state, now) > 0 {
            if let Err(err) = self.store.write_state(&state) {
                warn!(action, %err, "swept state not persisted");
            }
        }
        match route(&mut state, action, &args, now) {
            Ok(lines) => {
                if let Err(err) = self.store.write_state(&state) {
                    warn!(action, %err, "governance state not persisted");
                }
                render(&lines, &state, now)
            }
            // Rejections leave the snapshot unchanged; nothing to persist.
            Err(instruction) => instruction,
        }
    }
}

fn route(
    state: &mut GovernanceState,
    action: &str,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    match action {
        "create_epic" => run_create_epic(state, args, now),
        "create_task" => run_create_task(state, args, now),
        "add_subtask" => run_add_subtask(state, args, now),
        "assign" => run_assign(state, args, now),
        "start" => run_start(state, args, now),
        "complete" => run_complete(state, args, now),
        "defer" => run_defer(state, args, now),
        "abandon" => run_abandon(state, args, now),
        "delegate" => run_delegate(state, args, now),
        "status" => Ok(status_lines(state)),
        "list" => Ok(list_lines(state)),
        "update" => run_update(state, args, now),
        "branch" => run_branch(state, args, now),
        _ => unreachable!("action validated against VALID_LEDGER_ACTIONS"),
    }
}

// ── Argument helpers ────────────────────────────────────────────────────────

fn opt_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn require_str<'a>(args: &'a Value, key: &str, action: &str) -> Result<&'a str, String> {
    opt_str(args, key).ok_or_else(|| {
        render_instruction(
            &format!("the {action} action needs a \"{key}\" field."),
            example_for(action),
        )
    })
}

fn example_for(action: &str) -> &'static str {
    match action {
        "create_epic" => r#"{"action":"create_epic","name":"Harden the importer","category":"development"}"#,
        "create_task" => r#"{"action":"create_task","name":"Wire the config loader"}"#,
        "add_subtask" => r#"{"action":"add_subtask","taskId":"<task id>","name":"Write the parser tests"}"#,
        "assign" => r#"{"action":"assign","taskId":"<task id>","assignee":"builder-2"}"#,
        "start" => r#"{"action":"start","taskId":"<task id>"}"#,
        "complete" => r#"{"action":"complete","taskId":"<task id>","evidence":"all importer tests pass"}"#,
        "defer" => r#"{"action":"defer","taskId":"<task id>","reason":"blocked on upstream fix"}"#,
        "abandon" => r#"{"action":"abandon","epicId":"<epic id>"}"#,
        "delegate" => r#"{"action":"delegate","taskId":"<task id>","from":"coordinator","to":"builder","context":"importer is failing on utf-16 files","expectedOutput":"passing importer tests"}"#,
        "update" => r#"{"action":"update","taskId":"<task id>","status":"review"}"#,
        "branch" => r#"{"action":"branch","taskId":"<task id>","name":"Handle the utf-16 case"}"#,
        _ => r#"{"action":"status"}"#,
    }
}

// ── Routed operations ───────────────────────────────────────────────────────

fn run_create_epic(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let name = require_str(args, "name", "create_epic")?;
    let category = match opt_str(args, "category") {
        Some(raw) => parse_enum::<EpicCategory>(raw).ok_or_else(|| {
            render_instruction(
                &format!(
                    "\"{raw}\" is not an epic category. Use one of: development, research, \
                     governance, maintenance, spec-kit, ad-hoc."
                ),
                example_for("create_epic"),
            )
        })?,
        None => EpicCategory::AdHoc,
    };
    let governance_level = match opt_str(args, "governanceLevel") {
        Some(raw) => parse_enum::<GovernanceLevel>(raw).ok_or_else(|| {
            render_instruction(
                &format!("\"{raw}\" is not a governance level. Use light, standard, or strict."),
                example_for("create_epic"),
            )
        })?,
        None => GovernanceLevel::default(),
    };

    create_epic(state, name, category, governance_level, now)
        .map(|outcome| outcome.report)
        .map_err(|err| render_instruction(&err.to_string(), example_for("create_epic")))
}

fn run_create_task(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let name = require_str(args, "name", "create_task")?;
    let epic_id = opt_str(args, "epicId").map(EpicId::from);
    create_task(state, epic_id.as_ref(), name, now)
        .map(|outcome| outcome.report)
        .map_err(|err| render_instruction(&err.to_string(), example_for("create_task")))
}

fn run_add_subtask(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let task_id = TaskId::from(require_str(args, "taskId", "add_subtask")?);
    let name = require_str(args, "name", "add_subtask")?;
    add_subtask(state, &task_id, name, opt_str(args, "toolUsed"), now)
        .map(|outcome| outcome.report)
        .map_err(|err| render_instruction(&err.to_string(), example_for("add_subtask")))
}

fn run_assign(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let task_id = TaskId::from(require_str(args, "taskId", "assign")?);
    let assignee = require_str(args, "assignee", "assign")?;
    assign(state, &task_id, assignee, now)
        .map(|outcome| outcome.report)
        .map_err(|err| render_instruction(&err.to_string(), example_for("assign")))
}

fn run_start(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let task_id = TaskId::from(require_str(args, "taskId", "start")?);
    start_task(state, &task_id, now)
        .map(|outcome| outcome.report)
        .map_err(|err| render_instruction(&err.to_string(), example_for("start")))
}

/// `complete` resolves its target from whichever id is present:
/// subtask, then task, then epic.
fn run_complete(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    if let Some(subtask_id) = opt_str(args, "subtaskId") {
        let subtask_id = SubtaskId::from(subtask_id);
        return complete_subtask(state, &subtask_id, opt_str(args, "toolUsed"), now)
            .map(|outcome| outcome.report)
            .map_err(|err| render_instruction(&err.to_string(), example_for("complete")));
    }
    if let Some(task_id) = opt_str(args, "taskId") {
        let task_id = TaskId::from(task_id);
        return complete_task(state, &task_id, opt_str(args, "evidence"), now)
            .map(|outcome| outcome.report)
            .map_err(|err| render_instruction(&err.to_string(), example_for("complete")));
    }
    if let Some(epic_id) = opt_str(args, "epicId") {
        let epic_id = EpicId::from(epic_id);
        return complete_epic(state, &epic_id, now)
            .map(|outcome| outcome.report)
            .map_err(|err| render_instruction(&err.to_string(), example_for("complete")));
    }
    Err(render_instruction(
        "the complete action needs a \"subtaskId\", \"taskId\", or \"epicId\" field.",
        example_for("complete"),
    ))
}

/// `defer` resolves its target the same way `complete` does.
fn run_defer(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    if let Some(subtask_id) = opt_str(args, "subtaskId") {
        let subtask_id = SubtaskId::from(subtask_id);
        return defer_subtask(state, &subtask_id, now)
            .map(|outcome| outcome.report)
            .map_err(|err| render_instruction(&err.to_string(), example_for("defer")));
    }
    let reason = require_str(args, "reason", "defer").unwrap_or("");
    if let Some(task_id) = opt_str(args, "taskId") {
        let task_id = TaskId::from(task_id);
        return defer_task(state, &task_id, reason, now)
            .map(|outcome| outcome.report)
            .map_err(|err| render_instruction(&err.to_string(), example_for("defer")));
    }
    if let Some(epic_id) = opt_str(args, "epicId") {
        let epic_id = EpicId::from(epic_id);
        return defer_epic(state, &epic_id, reason, now)
            .map(|outcome| outcome.report)
            .map_err(|err| render_instruction(&err.to_string(), example_for("defer")));
    }
    Err(render_instruction(
        "the defer action needs a \"subtaskId\", \"taskId\", or \"epicId\" field.",
        example_for("defer"),
    ))
}

fn run_abandon(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let epic_id = EpicId::from(require_str(args, "epicId", "abandon")?);
    abandon_epic(state, &epic_id, now)
        .map(|outcome| outcome.report)
        .map_err(|err| render_instruction(&err.to_string(), example_for("abandon")))
}

fn run_delegate(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let task_id = TaskId::from(require_str(args, "taskId", "delegate")?);
    let from = detect_agent_role(require_str(args, "from", "delegate")?);
    let to = detect_agent_role(require_str(args, "to", "delegate")?);
    let context = opt_str(args, "context").unwrap_or("");
    let expected_output = opt_str(args, "expectedOutput").unwrap_or("");

    delegate(state, from, to, &task_id, context, expected_output, now)
        .map(|handoff| {
            vec![
                format!("Delegation {} recorded (pending).", handoff.delegation_id),
                String::new(),
                handoff.instructions,
            ]
        })
        .map_err(|err| render_instruction(&err.to_string(), example_for("delegate")))
}

fn run_update(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let task_id = TaskId::from(require_str(args, "taskId", "update")?);
    let status = match opt_str(args, "status") {
        Some(raw) => Some(parse_enum::<TaskStatus>(raw).ok_or_else(|| {
            render_instruction(
                &format!(
                    "\"{raw}\" is not a task status. Use planned, review, failed, or deferred; \
                     use the start and complete actions for active and completed."
                ),
                example_for("update"),
            )
        })?),
        None => None,
    };
    let update = TaskUpdate {
        name: opt_str(args, "name").map(str::to_owned),
        assignee: opt_str(args, "assignee").map(str::to_owned),
        status,
    };
    update_task(state, &task_id, &update, now)
        .map(|outcome| outcome.report)
        .map_err(|err| render_instruction(&err.to_string(), example_for("update")))
}

fn run_branch(
    state: &mut GovernanceState,
    args: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<String>, String> {
    let from_task_id = TaskId::from(require_str(args, "taskId", "branch")?);
    let name = require_str(args, "name", "branch")?;
    branch_task(state, &from_task_id, name, now)
        .map(|outcome| outcome.report)
        .map_err(|err| render_instruction(&err.to_string(), example_for("branch")))
}

// ── Read-only views ─────────────────────────────────────────────────────────

fn status_lines(state: &GovernanceState) -> Vec<String> {
    let mut lines = Vec::new();
    match state.active_epic() {
        Some(epic) => {
            lines.push(format!(
                "Active epic: \"{}\" ({}, {} tasks)",
                epic.name,
                epic.category,
                epic.tasks.len()
            ));
            match epic.active_task() {
                Some(task) => lines.push(format!(
                    "Active task: \"{}\" ({} subtasks pending)",
                    task.name,
                    task.pending_subtasks().len()
                )),
                None => lines.push("Active task: none. Writes are locked.".to_owned()),
            }
        }
        None => lines.push("No active epic. Create one to begin governed work.".to_owned()),
    }

    let open = state
        .delegations
        .iter()
        .filter(|delegation| delegation.status.is_open())
        .count();
    lines.push(format!(
        "Epics: {} total. Open delegations: {open}.",
        state.epics.len()
    ));
    lines
}

fn list_lines(state: &GovernanceState) -> Vec<String> {
    if state.epics.is_empty() {
        return vec!["The ledger is empty.".to_owned()];
    }
    let mut lines = Vec::new();
    for epic in &state.epics {
        lines.push(format!(
            "Epic \"{}\" [{}] ({}) {}",
            epic.name,
            format!("{:?}", epic.status).to_lowercase(),
            epic.category,
            epic.id
        ));
        for task in &epic.tasks {
            lines.push(format!(
                "  - \"{}\" [{}] {}",
                task.name,
                format!("{:?}", task.status).to_lowercase(),
                task.id
            ));
        }
    }
    lines
}

fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(Value::String(raw.to_lowercase())).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
