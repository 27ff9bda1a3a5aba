//! The delegation protocol.
//!
//! Delegation hands a task from one agent role to another, bounded three
//! ways: at most one open handoff per task, a chain depth limit, and a
//! routing table (coordination tier delegates to execution tier, execution
//! tier to validation tier) further narrowed by the owning epic's category.
//!
//! Expiry is lazy: [`sweep_expired`] runs whenever the ledger is read, and
//! an expired or rejected handoff frees its task for re-delegation.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use warden_core::{DelegationId, TaskId};
use warden_policy::{AgentRole, RoleTier, role_permissions};

use crate::errors::DelegationError;
use crate::types::{Delegation, DelegationStatus, EpicCategory, GovernanceState};

/// Maximum delegation chain depth for one task lineage.
pub const MAX_DELEGATION_DEPTH: u32 = 3;

/// Minutes before an unanswered handoff lapses.
pub const DELEGATION_EXPIRY_MINUTES: i64 = 30;

/// A successfully created handoff.
#[derive(Debug, Clone, PartialEq)]
pub struct Handoff {
    /// The new delegation record's id.
    pub delegation_id: DelegationId,
    /// Ready-to-transmit instruction text for the target agent.
    pub instructions: String,
}

/// Roles an epic category routes to.
#[must_use]
pub fn compatible_roles(category: EpicCategory) -> &'static [AgentRole] {
    match category {
        EpicCategory::Development | EpicCategory::Maintenance => &[AgentRole::Builder],
        EpicCategory::Research => &[AgentRole::Researcher],
        EpicCategory::SpecKit => &[AgentRole::Builder, AgentRole::Researcher],
        EpicCategory::Governance => &[AgentRole::Validator],
        EpicCategory::AdHoc => &[
            AgentRole::Builder,
            AgentRole::Researcher,
            AgentRole::Validator,
        ],
    }
}

/// Mark every open delegation past its expiry as expired, in place.
///
/// Returns how many were expired. Called opportunistically on every
/// ledger read; there is no background timer.
pub fn sweep_expired(state: &mut GovernanceState, now: DateTime<Utc>) -> usize {
    let mut expired = 0;
    for delegation in &mut state.delegations {
        if delegation.status.is_open() && delegation.expires_at <= now {
            delegation.status = DelegationStatus::Expired;
            expired += 1;
            debug!(delegation_id = %delegation.id, task_id = %delegation.task_id, "delegation expired");
        }
    }
    if expired > 0 {
        warn!(count = expired, "expired stale delegations during sweep");
    }
    expired
}

/// Current chain depth for a task: open and completed handoffs count,
/// expired and rejected ones do not.
#[must_use]
pub fn chain_depth(state: &GovernanceState, task_id: &TaskId) -> u32 {
    let count = state
        .delegations
        .iter()
        .filter(|delegation| &delegation.task_id == task_id)
        .filter(|delegation| delegation.status.consumes_depth())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Hand a task from `from` to `to`.
///
/// Runs the expiry sweep first, then validates the single-open-handoff
/// rule, the depth limit, tier routing, and epic-category compatibility.
/// On success the task is linked to a new pending delegation and a
/// ready-to-transmit [`Handoff`] is returned.
pub fn delegate(
    state: &mut GovernanceState,
    from: AgentRole,
    to: AgentRole,
    task_id: &TaskId,
    context: &str,
    expected_output: &str,
    now: DateTime<Utc>,
) -> Result<Handoff, DelegationError> {
    let _ = sweep_expired(state, now);

    let (task_name, category) = {
        let task = state
            .task(task_id)
            .ok_or_else(|| DelegationError::TaskNotFound {
                id: task_id.to_string(),
            })?;
        let category = state.epic(&task.epic_id).map(|epic| epic.category);
        (task.name.clone(), category)
    };

    if let Some(open) = state
        .delegations
        .iter()
        .find(|delegation| &delegation.task_id == task_id && delegation.status.is_open())
    {
        return Err(DelegationError::AlreadyDelegated {
            task_id: task_id.to_string(),
            delegation_id: open.id.to_string(),
        });
    }

    let depth = chain_depth(state, task_id) + 1;
    if depth > MAX_DELEGATION_DEPTH {
        return Err(DelegationError::DepthExceeded {
            task_id: task_id.to_string(),
            attempted: depth,
            max: MAX_DELEGATION_DEPTH,
        });
    }

    let route_allowed = matches!(
        (from.tier(), to.tier()),
        (RoleTier::Coordination, RoleTier::Execution)
            | (RoleTier::Execution, RoleTier::Validation)
    );
    if !route_allowed {
        return Err(DelegationError::RouteNotAllowed {
            from,
            from_tier: from.tier().to_string(),
            to,
            to_tier: to.tier().to_string(),
        });
    }

    if let Some(category) = category {
        let allowed = compatible_roles(category);
        // Category routing narrows who may *do* the work; validation-tier
        // targets are always acceptable as a second hop.
        if !allowed.contains(&to) && to.tier() != RoleTier::Validation {
            return Err(DelegationError::CategoryIncompatible {
                category,
                to,
                allowed: allowed.iter().map(ToString::to_string).collect(),
            });
        }
    }

    let delegation = Delegation {
        id: DelegationId::new(),
        from_agent: from,
        to_agent: to,
        task_id: task_id.clone(),
        context: context.to_owned(),
        expected_output: expected_output.to_owned(),
        depth,
        created_at: now,
        expires_at: now + Duration::minutes(DELEGATION_EXPIRY_MINUTES),
        status: DelegationStatus::Pending,
    };
    let instructions = handoff_instructions(&delegation, &task_name);
    let delegation_id = delegation.id.clone();

    if let Some(task) = state.task_mut(task_id) {
        task.delegated_to = Some(to);
        task.delegation_id = Some(delegation_id.clone());
        task.stamp.touch(now);
    }
    state.delegations.push(delegation);
    info!(%delegation_id, %task_id, %from, %to, depth, "task delegated");

    Ok(Handoff {
        delegation_id,
        instructions,
    })
}

/// Accept a pending delegation.
pub fn accept_delegation(
    state: &mut GovernanceState,
    delegation_id: &DelegationId,
    now: DateTime<Utc>,
) -> Result<(), DelegationError> {
    transition(state, delegation_id, DelegationStatus::Accepted, now)
}

/// Complete an open delegation.
pub fn complete_delegation(
    state: &mut GovernanceState,
    delegation_id: &DelegationId,
    now: DateTime<Utc>,
) -> Result<(), DelegationError> {
    transition(state, delegation_id, DelegationStatus::Completed, now)
}

/// Reject a pending delegation, freeing the task for re-delegation.
pub fn reject_delegation(
    state: &mut GovernanceState,
    delegation_id: &DelegationId,
    now: DateTime<Utc>,
) -> Result<(), DelegationError> {
    transition(state, delegation_id, DelegationStatus::Rejected, now)
}

fn transition(
    state: &mut GovernanceState,
    delegation_id: &DelegationId,
    to: DelegationStatus,
    now: DateTime<Utc>,
) -> Result<(), DelegationError> {
    let _ = sweep_expired(state, now);
    let delegation = state
        .delegations
        .iter_mut()
        .find(|delegation| &delegation.id == delegation_id)
        .ok_or_else(|| DelegationError::NotFound {
            id: delegation_id.to_string(),
        })?;

    let allowed = match to {
        DelegationStatus::Accepted | DelegationStatus::Rejected => {
            delegation.status == DelegationStatus::Pending
        }
        DelegationStatus::Completed => delegation.status.is_open(),
        DelegationStatus::Pending | DelegationStatus::Expired => false,
    };
    if !allowed {
        return Err(DelegationError::InvalidTransition {
            id: delegation_id.to_string(),
            from: delegation.status.to_string(),
            to: to.to_string(),
        });
    }
    delegation.status = to;

    // Terminal handoffs release the task link.
    if !to.is_open() {
        let task_id = delegation.task_id.clone();
        if let Some(task) = state.task_mut(&task_id) {
            task.delegated_to = None;
            task.delegation_id = None;
            task.stamp.touch(now);
        }
    }
    Ok(())
}

/// Render the handoff instruction text for a delegation.
///
/// Embeds the context, the expected output, and the target role's
/// permission boundary so the receiving agent knows its limits up front.
#[must_use]
pub fn handoff_instructions(delegation: &Delegation, task_name: &str) -> String {
    let boundary: Vec<String> = role_permissions(delegation.to_agent)
        .iter()
        .map(ToString::to_string)
        .collect();
    format!(
        "HANDOFF from {from} to {to} (hop {depth} of {max})\n\
         Task: {task_name}\n\
         Context: {context}\n\
         Expected output: {expected}\n\
         Permission boundary: you are a {to} agent and may only use {boundary} tools. \
         Expires in {expiry} minutes.",
        from = delegation.from_agent,
        to = delegation.to_agent,
        depth = delegation.depth,
        max = MAX_DELEGATION_DEPTH,
        context = delegation.context,
        expected = delegation.expected_output,
        boundary = boundary.join("/"),
        expiry = DELEGATION_EXPIRY_MINUTES,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{create_epic, create_task};
    use crate::types::GovernanceLevel;

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().expect("valid RFC 3339 instant")
    }

    fn now() -> DateTime<Utc> {
        instant("2026-02-01T00:00:00Z")
    }

    fn state_with_task(category: EpicCategory) -> (GovernanceState, TaskId) {
        let mut state = GovernanceState::default();
        let _ = create_epic(
            &mut state,
            "epic",
            category,
            GovernanceLevel::Standard,
            now(),
        )
        .unwrap();
        let _ = create_task(&mut state, None, "delegatable", now()).unwrap();
        let task_id = state.active_epic().unwrap().tasks[0].id.clone();
        (state, task_id)
    }

    #[test]
    fn coordinator_delegates_development_to_builder() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let handoff = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "implement the parser",
            "a passing test suite",
            now(),
        )
        .unwrap();

        let task = state.task(&task_id).unwrap();
        assert_eq!(task.delegated_to, Some(AgentRole::Builder));
        assert_eq!(task.delegation_id, Some(handoff.delegation_id.clone()));

        let delegation = state.delegation(&handoff.delegation_id).unwrap();
        assert_eq!(delegation.status, DelegationStatus::Pending);
        assert_eq!(delegation.depth, 1);
        assert_eq!(
            delegation.expires_at,
            now() + Duration::minutes(DELEGATION_EXPIRY_MINUTES)
        );
    }

    #[test]
    fn handoff_instructions_embed_boundary_and_context() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let handoff = delegate(
            &mut state,
            AgentRole::Meta,
            AgentRole::Builder,
            &task_id,
            "port the config loader",
            "merged config struct",
            now(),
        )
        .unwrap();

        assert!(handoff.instructions.contains("port the config loader"));
        assert!(handoff.instructions.contains("merged config struct"));
        assert!(handoff.instructions.contains("read/write/execute"));
        assert!(handoff.instructions.contains("hop 1 of 3"));
    }

    #[test]
    fn open_delegation_blocks_a_second_one() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let first = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap();

        let err = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DelegationError::AlreadyDelegated {
                task_id: task_id.to_string(),
                delegation_id: first.delegation_id.to_string(),
            }
        );
    }

    #[test]
    fn expired_delegation_frees_the_task() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let _ = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap();

        let later = now() + Duration::minutes(DELEGATION_EXPIRY_MINUTES + 1);
        let result = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "second try",
            "out",
            later,
        );
        assert!(result.is_ok(), "expired handoff should free the task");
        assert_eq!(state.delegations[0].status, DelegationStatus::Expired);
    }

    #[test]
    fn depth_three_lineage_rejects_a_fourth_hop() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let mut when = now();
        // Three completed hops consume the full chain.
        for _ in 0..3 {
            let handoff = delegate(
                &mut state,
                AgentRole::Coordinator,
                AgentRole::Builder,
                &task_id,
                "ctx",
                "out",
                when,
            )
            .unwrap();
            complete_delegation(&mut state, &handoff.delegation_id, when).unwrap();
            when += Duration::minutes(1);
        }
        assert_eq!(chain_depth(&state, &task_id), 3);

        let err = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "ctx",
            "out",
            when,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DelegationError::DepthExceeded {
                task_id: task_id.to_string(),
                attempted: 4,
                max: 3,
            }
        );
    }

    #[test]
    fn depth_two_lineage_accepts_one_more_hop() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let mut when = now();
        for _ in 0..2 {
            let handoff = delegate(
                &mut state,
                AgentRole::Coordinator,
                AgentRole::Builder,
                &task_id,
                "ctx",
                "out",
                when,
            )
            .unwrap();
            complete_delegation(&mut state, &handoff.delegation_id, when).unwrap();
            when += Duration::minutes(1);
        }
        assert!(
            delegate(
                &mut state,
                AgentRole::Coordinator,
                AgentRole::Builder,
                &task_id,
                "ctx",
                "out",
                when,
            )
            .is_ok()
        );
    }

    #[test]
    fn rejected_handoffs_consume_no_depth() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let handoff = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap();
        reject_delegation(&mut state, &handoff.delegation_id, now()).unwrap();

        assert_eq!(chain_depth(&state, &task_id), 0);
        let task = state.task(&task_id).unwrap();
        assert_eq!(task.delegated_to, None);
        assert_eq!(task.delegation_id, None);
    }

    #[test]
    fn execution_tier_routes_only_to_validation() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let err = delegate(
            &mut state,
            AgentRole::Builder,
            AgentRole::Researcher,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DelegationError::RouteNotAllowed { .. }));

        assert!(
            delegate(
                &mut state,
                AgentRole::Builder,
                AgentRole::Validator,
                &task_id,
                "verify my work",
                "a review verdict",
                now(),
            )
            .is_ok()
        );
    }

    #[test]
    fn validator_tier_may_not_delegate_at_all() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let err = delegate(
            &mut state,
            AgentRole::Validator,
            AgentRole::Builder,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DelegationError::RouteNotAllowed { .. }));
    }

    #[test]
    fn development_epic_rejects_researcher_target() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let err = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Researcher,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DelegationError::CategoryIncompatible {
                category: EpicCategory::Development,
                to: AgentRole::Researcher,
                allowed: vec!["builder".to_owned()],
            }
        );
    }

    #[test]
    fn research_epic_routes_to_researcher() {
        let (mut state, task_id) = state_with_task(EpicCategory::Research);
        assert!(
            delegate(
                &mut state,
                AgentRole::Coordinator,
                AgentRole::Researcher,
                &task_id,
                "ctx",
                "out",
                now(),
            )
            .is_ok()
        );
    }

    #[test]
    fn ad_hoc_epic_routes_anywhere_in_execution_and_validation() {
        for target in [AgentRole::Builder, AgentRole::Researcher] {
            let (mut state, task_id) = state_with_task(EpicCategory::AdHoc);
            assert!(
                delegate(
                    &mut state,
                    AgentRole::Meta,
                    target,
                    &task_id,
                    "ctx",
                    "out",
                    now(),
                )
                .is_ok(),
                "ad-hoc should route to {target}"
            );
        }
    }

    #[test]
    fn accept_then_complete_lifecycle() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let handoff = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap();

        accept_delegation(&mut state, &handoff.delegation_id, now()).unwrap();
        assert_eq!(
            state.delegation(&handoff.delegation_id).unwrap().status,
            DelegationStatus::Accepted
        );

        // Accepting twice is invalid.
        assert!(matches!(
            accept_delegation(&mut state, &handoff.delegation_id, now()),
            Err(DelegationError::InvalidTransition { .. })
        ));

        complete_delegation(&mut state, &handoff.delegation_id, now()).unwrap();
        assert_eq!(
            state.delegation(&handoff.delegation_id).unwrap().status,
            DelegationStatus::Completed
        );
        assert_eq!(state.task(&task_id).unwrap().delegation_id, None);
    }

    #[test]
    fn sweep_only_touches_open_past_expiry() {
        let (mut state, task_id) = state_with_task(EpicCategory::Development);
        let handoff = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &task_id,
            "ctx",
            "out",
            now(),
        )
        .unwrap();
        complete_delegation(&mut state, &handoff.delegation_id, now()).unwrap();

        let later = now() + Duration::hours(2);
        assert_eq!(sweep_expired(&mut state, later), 0);
        assert_eq!(
            state.delegation(&handoff.delegation_id).unwrap().status,
            DelegationStatus::Completed
        );
    }

    #[test]
    fn delegate_unknown_task_is_structured_rejection() {
        let mut state = GovernanceState::default();
        let missing = TaskId::from("tsk-missing");
        let err = delegate(
            &mut state,
            AgentRole::Coordinator,
            AgentRole::Builder,
            &missing,
            "ctx",
            "out",
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DelegationError::TaskNotFound {
                id: "tsk-missing".to_owned(),
            }
        );
    }
}
