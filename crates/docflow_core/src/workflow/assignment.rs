//! Executor assignment and internal delegation.
//!
//! # Responsibility
//! - Validate requested main executor / co-executor / contributor slots.
//! - Apply an assignment to a document, including its stage side effect.
//! - Validate delegation to an employee of the main executor's department.
//!
//! # Invariants
//! - Every assigned user exists in the directory.
//! - No user holds two slots after assignment.
//! - `department_id` always mirrors the main executor's department.

use crate::config::DuplicateAssignmentPolicy;
use crate::directory::DirectoryProvider;
use crate::model::correspondence::Correspondence;
use crate::model::stage::Stage;
use crate::model::user::{Actor, User, UserId};
use crate::workflow::action::AssignmentRequest;
use crate::workflow::error::TransitionError;

/// Assignment after validation and deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAssignment {
    pub main_executor: User,
    pub co_executor_ids: Vec<UserId>,
    pub contributor_ids: Vec<UserId>,
}

/// Validates an assignment request against the directory.
///
/// Repeats inside one list are always collapsed. Overlap between slots is
/// handled by `policy`: co-executors outrank contributors, and the main
/// executor outranks both.
pub fn resolve_assignment<D: DirectoryProvider + ?Sized>(
    request: &AssignmentRequest,
    policy: DuplicateAssignmentPolicy,
    directory: &D,
) -> Result<ResolvedAssignment, TransitionError> {
    let main_executor = directory
        .get_user(request.main_executor_id)
        .ok_or(TransitionError::InvalidExecutor(request.main_executor_id))?;
    let main_id = main_executor.id;

    let mut co_executor_ids = dedup_preserving_order(&request.co_executor_ids);
    resolve_overlap(&mut co_executor_ids, &[main_id], policy)?;

    let mut contributor_ids = dedup_preserving_order(&request.contributor_ids);
    let mut outranking = co_executor_ids.clone();
    outranking.push(main_id);
    resolve_overlap(&mut contributor_ids, &outranking, policy)?;

    for user_id in co_executor_ids.iter().chain(contributor_ids.iter()) {
        if directory.get_user(*user_id).is_none() {
            return Err(TransitionError::InvalidExecutor(*user_id));
        }
    }

    Ok(ResolvedAssignment {
        main_executor,
        co_executor_ids,
        contributor_ids,
    })
}

/// Writes a resolved assignment into the document.
///
/// Returns `true` when the call also moved the document to `EXECUTION`.
pub fn apply_assignment(document: &mut Correspondence, assignment: ResolvedAssignment) -> bool {
    if document.main_executor_id != Some(assignment.main_executor.id) {
        document.internal_assignee_id = None;
    }
    document.main_executor_id = Some(assignment.main_executor.id);
    document.department_id = assignment.main_executor.department_id;
    document.co_executor_ids = assignment.co_executor_ids;
    document.contributor_ids = assignment.contributor_ids;

    if document.stage.precedes_execution() {
        document.stage = Stage::Execution;
        return true;
    }
    false
}

/// Validates a delegation target for the acting main executor.
///
/// Authorization (actor is main executor with the delegating role) is checked
/// by the stage machine guard before this runs.
pub fn resolve_delegate<D: DirectoryProvider + ?Sized>(
    actor: &Actor,
    employee_id: UserId,
    directory: &D,
) -> Result<User, TransitionError> {
    let delegator = directory
        .get_user(actor.id)
        .ok_or(TransitionError::InvalidExecutor(actor.id))?;
    let employee = directory
        .get_user(employee_id)
        .ok_or(TransitionError::InvalidExecutor(employee_id))?;

    if employee.id == delegator.id {
        return Err(TransitionError::DuplicateAssignment(employee.id));
    }
    if delegator.department_id.is_none() || employee.department_id != delegator.department_id {
        return Err(TransitionError::CrossDepartmentDelegation {
            employee_id,
            expected: delegator.department_id,
            actual: employee.department_id,
        });
    }

    Ok(employee)
}

fn dedup_preserving_order(ids: &[UserId]) -> Vec<UserId> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

fn resolve_overlap(
    ids: &mut Vec<UserId>,
    outranking: &[UserId],
    policy: DuplicateAssignmentPolicy,
) -> Result<(), TransitionError> {
    match policy {
        DuplicateAssignmentPolicy::Reject => {
            if let Some(duplicate) = ids.iter().find(|id| outranking.contains(*id)) {
                return Err(TransitionError::DuplicateAssignment(*duplicate));
            }
        }
        DuplicateAssignmentPolicy::Deduplicate => ids.retain(|id| !outranking.contains(id)),
    }
    Ok(())
}
