//! Action requests accepted by the stage machine.

use crate::model::stage::ActionName;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

/// Reviewer verdict for one review cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Executor slots requested by an `assignExecutors` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub main_executor_id: UserId,
    #[serde(default)]
    pub co_executor_ids: Vec<UserId>,
    #[serde(default)]
    pub contributor_ids: Vec<UserId>,
}

/// One requested action together with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum WorkflowAction {
    Register,
    SubmitForResolution,
    Resolve { resolution: String },
    AssignExecutors(AssignmentRequest),
    DelegateInternal { employee_id: UserId },
    StartDrafting,
    SubmitForReview,
    ApproveReview { comment: Option<String> },
    RejectReview { comment: String },
    Sign,
    Dispatch,
    Hold { reason: Option<String> },
    Resume,
    Cancel { reason: String },
    Reject { reason: String },
    Archive,
    Unarchive,
    UpdateDeadline { deadline: Option<i64> },
}

impl WorkflowAction {
    pub fn name(&self) -> ActionName {
        match self {
            Self::Register => ActionName::Register,
            Self::SubmitForResolution => ActionName::SubmitForResolution,
            Self::Resolve { .. } => ActionName::Resolve,
            Self::AssignExecutors(_) => ActionName::AssignExecutors,
            Self::DelegateInternal { .. } => ActionName::DelegateInternal,
            Self::StartDrafting => ActionName::StartDrafting,
            Self::SubmitForReview => ActionName::SubmitForReview,
            Self::ApproveReview { .. } => ActionName::ApproveReview,
            Self::RejectReview { .. } => ActionName::RejectReview,
            Self::Sign => ActionName::Sign,
            Self::Dispatch => ActionName::Dispatch,
            Self::Hold { .. } => ActionName::Hold,
            Self::Resume => ActionName::Resume,
            Self::Cancel { .. } => ActionName::Cancel,
            Self::Reject { .. } => ActionName::Reject,
            Self::Archive => ActionName::Archive,
            Self::Unarchive => ActionName::Unarchive,
            Self::UpdateDeadline { .. } => ActionName::UpdateDeadline,
        }
    }

    /// Builds the approve or reject action for a reviewer decision.
    pub fn review(decision: ReviewDecision, comment: Option<String>) -> Self {
        match decision {
            ReviewDecision::Approve => Self::ApproveReview { comment },
            ReviewDecision::Reject => Self::RejectReview {
                comment: comment.unwrap_or_default(),
            },
        }
    }
}
