//! Correspondence aggregate.
//!
//! # Responsibility
//! - Define the document record routed through the workflow.
//! - Own the reviewer list and the append-only audit log.
//! - Check aggregate invariants before persistence and after reads.
//!
//! # Invariants
//! - Pending reviewers exist only in `FINAL_REVIEW` (or while that stage is
//!   paused on hold).
//! - `main_executor_id` is set on every main-line stage from `EXECUTION` on.
//! - `ON_HOLD` and `ARCHIVED` always remember the stage they came from.
//! - Audit entries are ordered by timestamp.

use crate::model::role::FunctionalRoleTag;
use crate::model::stage::Stage;
use crate::model::user::{DepartmentId, UserId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Integer id assigned by the document store.
pub type DocumentId = i64;

/// Direction of the correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrespondenceType {
    Incoming,
    Outgoing,
}

impl CorrespondenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// Decision state of one reviewer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// One required reviewer for the current review cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub user_id: UserId,
    /// Functional position the user was resolved for.
    pub role_tag: FunctionalRoleTag,
    pub status: ReviewStatus,
    /// Required when `status == Rejected`.
    pub comment: Option<String>,
}

impl Reviewer {
    pub fn pending(user_id: UserId, role_tag: FunctionalRoleTag) -> Self {
        Self {
            user_id,
            role_tag,
            status: ReviewStatus::Pending,
            comment: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }
}

/// Immutable record of one applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    /// Human-readable description of what happened.
    pub action: String,
    pub details: Option<String>,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    /// `None` for system-originated entries.
    pub user_id: Option<UserId>,
    pub from_stage: Option<Stage>,
    pub to_stage: Stage,
}

/// Caller input for creating a new document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCorrespondence {
    pub kind: CorrespondenceType,
    pub kartoteka: String,
    pub title: String,
    pub content: String,
    pub source: String,
    pub deadline: Option<i64>,
}

/// Document aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Assigned by the store on insert; `0` before that.
    pub id: DocumentId,
    /// Optimistic concurrency token maintained by the store.
    pub version: u64,
    #[serde(rename = "type")]
    pub kind: CorrespondenceType,
    pub stage: Stage,
    /// Stage to restore on resume/unarchive.
    pub prior_stage: Option<Stage>,
    /// Filing category, opaque to the workflow.
    pub kartoteka: String,
    pub title: String,
    pub content: String,
    pub source: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub deadline: Option<i64>,
    /// Per-stage SLA maintained by external monitoring.
    pub stage_deadline: Option<i64>,
    pub author_id: UserId,
    pub main_executor_id: Option<UserId>,
    /// Denormalized from the main executor for filtering.
    pub department_id: Option<DepartmentId>,
    pub internal_assignee_id: Option<UserId>,
    pub co_executor_ids: Vec<UserId>,
    pub contributor_ids: Vec<UserId>,
    pub resolution: Option<String>,
    pub reviewers: Vec<Reviewer>,
    pub audit_log: Vec<AuditLogEntry>,
}

impl Correspondence {
    /// Builds an unsaved document in `PENDING_REGISTRATION`.
    pub fn new(input: NewCorrespondence, author_id: UserId, created_at: i64) -> Self {
        Self {
            id: 0,
            version: 0,
            kind: input.kind,
            stage: Stage::PendingRegistration,
            prior_stage: None,
            kartoteka: input.kartoteka,
            title: input.title,
            content: input.content,
            source: input.source,
            created_at,
            deadline: input.deadline,
            stage_deadline: None,
            author_id,
            main_executor_id: None,
            department_id: None,
            internal_assignee_id: None,
            co_executor_ids: Vec::new(),
            contributor_ids: Vec::new(),
            resolution: None,
            reviewers: Vec::new(),
            audit_log: Vec::new(),
        }
    }

    /// Stage the document effectively sits on, looking through a hold.
    pub fn working_stage(&self) -> Stage {
        match (self.stage, self.prior_stage) {
            (Stage::OnHold, Some(prior)) => prior,
            (stage, _) => stage,
        }
    }

    pub fn pending_reviewers(&self) -> impl Iterator<Item = &Reviewer> {
        self.reviewers.iter().filter(|reviewer| reviewer.is_pending())
    }

    pub fn has_pending_review_from(&self, user_id: UserId) -> bool {
        self.pending_reviewers()
            .any(|reviewer| reviewer.user_id == user_id)
    }

    /// Timestamp of the most recent audit entry.
    pub fn last_audit_timestamp(&self) -> Option<i64> {
        self.audit_log.last().map(|entry| entry.timestamp)
    }

    /// Checks aggregate invariants.
    pub fn validate(&self) -> Result<(), CorrespondenceValidationError> {
        if self.title.trim().is_empty() {
            return Err(CorrespondenceValidationError::EmptyTitle);
        }

        match self.stage {
            Stage::OnHold => match self.prior_stage {
                Some(prior) if prior.is_active() => {}
                other => return Err(CorrespondenceValidationError::InvalidPriorStage(other)),
            },
            Stage::Archived => match self.prior_stage {
                Some(prior) if prior.is_terminal() && prior != Stage::Archived => {}
                other => return Err(CorrespondenceValidationError::InvalidPriorStage(other)),
            },
            _ => {}
        }

        if self.working_stage().requires_main_executor() && self.main_executor_id.is_none() {
            return Err(CorrespondenceValidationError::MissingMainExecutor(
                self.stage,
            ));
        }

        let in_review = self.working_stage() == Stage::FinalReview;
        if in_review && self.reviewers.is_empty() {
            return Err(CorrespondenceValidationError::MissingReviewers);
        }
        if !in_review && self.pending_reviewers().next().is_some() {
            return Err(CorrespondenceValidationError::PendingReviewersOutsideReview(
                self.stage,
            ));
        }

        for reviewer in &self.reviewers {
            if reviewer.status == ReviewStatus::Rejected
                && reviewer
                    .comment
                    .as_deref()
                    .map_or(true, |comment| comment.trim().is_empty())
            {
                return Err(CorrespondenceValidationError::RejectionWithoutComment(
                    reviewer.user_id,
                ));
            }
        }

        if let Some(main) = self.main_executor_id {
            if self.co_executor_ids.contains(&main) {
                return Err(CorrespondenceValidationError::OverlappingAssignment(main));
            }
        }

        let out_of_order = self
            .audit_log
            .windows(2)
            .any(|pair| pair[1].timestamp < pair[0].timestamp);
        if out_of_order {
            return Err(CorrespondenceValidationError::AuditLogOutOfOrder);
        }

        Ok(())
    }
}

/// Aggregate invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrespondenceValidationError {
    EmptyTitle,
    InvalidPriorStage(Option<Stage>),
    MissingMainExecutor(Stage),
    MissingReviewers,
    PendingReviewersOutsideReview(Stage),
    RejectionWithoutComment(UserId),
    OverlappingAssignment(UserId),
    AuditLogOutOfOrder,
}

impl Display for CorrespondenceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be blank"),
            Self::InvalidPriorStage(Some(stage)) => {
                write!(f, "invalid prior stage `{stage}` for current stage")
            }
            Self::InvalidPriorStage(None) => {
                write!(f, "prior stage is required for on-hold and archived documents")
            }
            Self::MissingMainExecutor(stage) => {
                write!(f, "stage `{stage}` requires a main executor")
            }
            Self::MissingReviewers => write!(f, "final review requires at least one reviewer"),
            Self::PendingReviewersOutsideReview(stage) => {
                write!(f, "pending reviewers are not allowed in stage `{stage}`")
            }
            Self::RejectionWithoutComment(user_id) => {
                write!(f, "rejection by reviewer {user_id} has no comment")
            }
            Self::OverlappingAssignment(user_id) => {
                write!(f, "user {user_id} is both main executor and co-executor")
            }
            Self::AuditLogOutOfOrder => write!(f, "audit log entries are not ordered by time"),
        }
    }
}

impl Error for CorrespondenceValidationError {}

#[cfg(test)]
mod tests {
    use super::{
        Correspondence, CorrespondenceType, CorrespondenceValidationError, NewCorrespondence,
        Reviewer,
    };
    use crate::model::role::FunctionalRoleTag;
    use crate::model::stage::Stage;

    fn draft() -> Correspondence {
        Correspondence::new(
            NewCorrespondence {
                kind: CorrespondenceType::Incoming,
                kartoteka: "K-01".to_string(),
                title: "Central bank inquiry".to_string(),
                content: "body".to_string(),
                source: "CBU".to_string(),
                deadline: None,
            },
            7,
            1_000,
        )
    }

    #[test]
    fn new_document_starts_pending_registration_and_is_valid() {
        let doc = draft();
        assert_eq!(doc.stage, Stage::PendingRegistration);
        assert_eq!(doc.version, 0);
        doc.validate().expect("fresh document should be valid");
    }

    #[test]
    fn execution_without_main_executor_is_invalid() {
        let mut doc = draft();
        doc.stage = Stage::Execution;
        assert_eq!(
            doc.validate().expect_err("missing executor"),
            CorrespondenceValidationError::MissingMainExecutor(Stage::Execution)
        );
    }

    #[test]
    fn on_hold_looks_through_to_prior_stage() {
        let mut doc = draft();
        doc.stage = Stage::OnHold;
        assert!(doc.validate().is_err());

        doc.prior_stage = Some(Stage::FinalReview);
        doc.main_executor_id = Some(3);
        doc.reviewers = vec![Reviewer::pending(
            11,
            FunctionalRoleTag::new("legal").expect("tag"),
        )];
        assert_eq!(doc.working_stage(), Stage::FinalReview);
        doc.validate().expect("paused review keeps pending reviewers");
    }

    #[test]
    fn pending_reviewers_outside_review_are_invalid() {
        let mut doc = draft();
        doc.reviewers = vec![Reviewer::pending(
            11,
            FunctionalRoleTag::new("legal").expect("tag"),
        )];
        assert_eq!(
            doc.validate().expect_err("stray reviewer"),
            CorrespondenceValidationError::PendingReviewersOutsideReview(
                Stage::PendingRegistration
            )
        );
    }

    #[test]
    fn serializes_kind_as_type() {
        let json = serde_json::to_value(draft()).expect("serialize");
        assert_eq!(json["type"], "incoming");
        assert_eq!(json["stage"], "PENDING_REGISTRATION");
    }
}
