//! Errors produced by the pure stage machine.

use crate::model::correspondence::CorrespondenceValidationError;
use crate::model::role::{FunctionalRoleTag, Role};
use crate::model::stage::{ActionName, Stage};
use crate::model::user::{DepartmentId, UserId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a requested transition was not applied.
///
/// Every variant leaves the input snapshot untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The action is not legal from the current stage.
    TransitionDenied { stage: Stage, action: ActionName },
    /// The actor's role or identity fails the action's guard.
    NotAuthorized {
        action: ActionName,
        actor_id: UserId,
        role: Role,
    },
    /// Approve/reject from a user without a pending reviewer entry.
    NotAReviewer(UserId),
    /// Mandatory comment or reason text is missing.
    CommentRequired(ActionName),
    /// Referenced user does not exist in the directory.
    InvalidExecutor(UserId),
    /// One user appears in two assignment slots.
    DuplicateAssignment(UserId),
    /// Delegation target sits outside the delegator's department.
    CrossDepartmentDelegation {
        employee_id: UserId,
        expected: Option<DepartmentId>,
        actual: Option<DepartmentId>,
    },
    /// No current holder for a required reviewer position.
    ReviewerUnresolved(FunctionalRoleTag),
    /// Deadline precedes document creation.
    InvalidDeadline(i64),
    /// Computed snapshot violates an aggregate invariant.
    InvalidDocument(CorrespondenceValidationError),
}

impl TransitionError {
    /// Stable short code for logs and API mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TransitionDenied { .. } => "transition_denied",
            Self::NotAuthorized { .. } => "not_authorized",
            Self::NotAReviewer(_) => "not_a_reviewer",
            Self::CommentRequired(_) => "comment_required",
            Self::InvalidExecutor(_) => "invalid_executor",
            Self::DuplicateAssignment(_) => "duplicate_assignment",
            Self::CrossDepartmentDelegation { .. } => "cross_department_delegation",
            Self::ReviewerUnresolved(_) => "reviewer_unresolved",
            Self::InvalidDeadline(_) => "invalid_deadline",
            Self::InvalidDocument(_) => "invalid_document",
        }
    }
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransitionDenied { stage, action } => {
                write!(f, "action `{action}` is not allowed in stage `{stage}`")
            }
            Self::NotAuthorized {
                action,
                actor_id,
                role,
            } => write!(
                f,
                "user {actor_id} with role `{role}` may not perform `{action}`"
            ),
            Self::NotAReviewer(user_id) => {
                write!(f, "user {user_id} has no pending review on this document")
            }
            Self::CommentRequired(action) => write!(f, "`{action}` requires a comment"),
            Self::InvalidExecutor(user_id) => write!(f, "unknown user: {user_id}"),
            Self::DuplicateAssignment(user_id) => {
                write!(f, "user {user_id} is assigned more than once")
            }
            Self::CrossDepartmentDelegation {
                employee_id,
                expected,
                actual,
            } => write!(
                f,
                "user {employee_id} belongs to department {actual:?}, expected {expected:?}"
            ),
            Self::ReviewerUnresolved(tag) => {
                write!(f, "no current holder for reviewer role `{tag}`")
            }
            Self::InvalidDeadline(deadline) => {
                write!(f, "deadline {deadline} precedes document creation")
            }
            Self::InvalidDocument(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransitionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDocument(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CorrespondenceValidationError> for TransitionError {
    fn from(value: CorrespondenceValidationError) -> Self {
        Self::InvalidDocument(value)
    }
}
