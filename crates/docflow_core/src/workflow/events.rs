//! Audit entries and notification intents for applied transitions.
//!
//! # Responsibility
//! - Build the immutable audit record of one applied transition.
//! - Derive who must be told about the transition, and why.
//!
//! # Invariants
//! - Pure construction only; delivery belongs to external sinks.
//! - The acting user never receives a notification about their own action.
//! - One intent per (recipient, kind) pair per transition.

use crate::model::correspondence::{AuditLogEntry, Correspondence, DocumentId};
use crate::model::stage::{ActionName, Stage};
use crate::model::user::{Actor, UserId};
use crate::workflow::action::WorkflowAction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason a user is being notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MainExecutorAssigned,
    CoExecutorAssigned,
    ContributorAssigned,
    InternalDelegation,
    ReviewRequested,
    RevisionRequested,
    ReviewConsensusReached,
    Completed,
    Cancelled,
    Rejected,
    PutOnHold,
    Resumed,
    DeadlineChanged,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MainExecutorAssigned => "main_executor_assigned",
            Self::CoExecutorAssigned => "co_executor_assigned",
            Self::ContributorAssigned => "contributor_assigned",
            Self::InternalDelegation => "internal_delegation",
            Self::ReviewRequested => "review_requested",
            Self::RevisionRequested => "revision_requested",
            Self::ReviewConsensusReached => "review_consensus_reached",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
            Self::PutOnHold => "put_on_hold",
            Self::Resumed => "resumed",
            Self::DeadlineChanged => "deadline_changed",
        }
    }
}

/// Request to tell one user about one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    /// Free text attached by the actor (rejection comment, cancel reason).
    pub comment: Option<String>,
}

/// Snapshots around one applied transition.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub action: &'a WorkflowAction,
    pub actor: &'a Actor,
    pub before: &'a Correspondence,
    pub after: &'a Correspondence,
}

/// Builds one immutable audit record.
pub fn build_audit_entry(
    action: impl Into<String>,
    actor: Option<&Actor>,
    details: Option<String>,
    from_stage: Option<Stage>,
    to_stage: Stage,
    timestamp: i64,
) -> AuditLogEntry {
    AuditLogEntry {
        id: Uuid::new_v4(),
        action: action.into(),
        details,
        timestamp,
        user_id: actor.map(|actor| actor.id),
        from_stage,
        to_stage,
    }
}

/// Human-readable description of an applied action.
pub fn describe_transition(action: ActionName, from: Stage, to: Stage) -> &'static str {
    match action {
        ActionName::Register => "Document registered",
        ActionName::SubmitForResolution => "Sent for resolution",
        ActionName::Resolve => "Resolution issued",
        ActionName::AssignExecutors if from != to => "Executors assigned; execution started",
        ActionName::AssignExecutors => "Executors reassigned",
        ActionName::DelegateInternal => "Delegated within department",
        ActionName::StartDrafting => "Drafting started",
        ActionName::SubmitForReview => "Submitted for final review",
        ActionName::ApproveReview if to == Stage::Signature => {
            "Review approved; all reviewers agreed"
        }
        ActionName::ApproveReview => "Review approved",
        ActionName::RejectReview => "Review rejected; revision requested",
        ActionName::Sign => "Signed",
        ActionName::Dispatch => "Dispatched",
        ActionName::Hold => "Put on hold",
        ActionName::Resume => "Resumed",
        ActionName::Cancel => "Cancelled",
        ActionName::Reject => "Rejected",
        ActionName::Archive => "Archived",
        ActionName::Unarchive => "Unarchived",
        ActionName::UpdateDeadline => "Deadline updated",
    }
}

/// Derives notification intents for one applied transition.
pub fn build_notification_intents(transition: &Transition<'_>) -> Vec<NotificationIntent> {
    let mut intents = Recipients::new(transition);
    let before = transition.before;
    let after = transition.after;

    match transition.action {
        WorkflowAction::AssignExecutors(_) => {
            if after.main_executor_id != before.main_executor_id {
                intents.push(after.main_executor_id, NotificationKind::MainExecutorAssigned);
            }
            for id in &after.co_executor_ids {
                if !before.co_executor_ids.contains(id) {
                    intents.push(Some(*id), NotificationKind::CoExecutorAssigned);
                }
            }
            for id in &after.contributor_ids {
                if !before.contributor_ids.contains(id) {
                    intents.push(Some(*id), NotificationKind::ContributorAssigned);
                }
            }
        }
        WorkflowAction::DelegateInternal { .. } => {
            intents.push(after.internal_assignee_id, NotificationKind::InternalDelegation);
        }
        WorkflowAction::SubmitForReview => {
            for reviewer in after.pending_reviewers() {
                intents.push(Some(reviewer.user_id), NotificationKind::ReviewRequested);
            }
        }
        WorkflowAction::ApproveReview { .. } if after.stage == Stage::Signature => {
            intents.push(Some(after.author_id), NotificationKind::ReviewConsensusReached);
            intents.push(after.main_executor_id, NotificationKind::ReviewConsensusReached);
        }
        WorkflowAction::RejectReview { comment } => {
            intents.comment = Some(comment.trim().to_string());
            intents.push(Some(after.author_id), NotificationKind::RevisionRequested);
            intents.push(after.main_executor_id, NotificationKind::RevisionRequested);
            intents.push(after.internal_assignee_id, NotificationKind::RevisionRequested);
        }
        WorkflowAction::Dispatch => {
            intents.push(Some(after.author_id), NotificationKind::Completed);
            intents.push(after.main_executor_id, NotificationKind::Completed);
        }
        WorkflowAction::Cancel { reason } | WorkflowAction::Reject { reason } => {
            let kind = if after.stage == Stage::Cancelled {
                NotificationKind::Cancelled
            } else {
                NotificationKind::Rejected
            };
            intents.comment = Some(reason.trim().to_string());
            intents.push_working_group(after, kind);
        }
        WorkflowAction::Hold { reason } => {
            intents.comment = reason.clone();
            intents.push_working_group(after, NotificationKind::PutOnHold);
        }
        WorkflowAction::Resume => intents.push_working_group(after, NotificationKind::Resumed),
        WorkflowAction::UpdateDeadline { .. } if after.deadline != before.deadline => {
            intents.push_working_group(after, NotificationKind::DeadlineChanged);
        }
        _ => {}
    }

    intents.into_vec()
}

struct Recipients {
    document_id: DocumentId,
    actor_id: UserId,
    comment: Option<String>,
    intents: Vec<NotificationIntent>,
}

impl Recipients {
    fn new(transition: &Transition<'_>) -> Self {
        Self {
            document_id: transition.after.id,
            actor_id: transition.actor.id,
            comment: None,
            intents: Vec::new(),
        }
    }

    fn push(&mut self, recipient: Option<UserId>, kind: NotificationKind) {
        let Some(recipient_id) = recipient else {
            return;
        };
        if recipient_id == self.actor_id {
            return;
        }
        let seen = self
            .intents
            .iter()
            .any(|intent| intent.recipient_id == recipient_id && intent.kind == kind);
        if seen {
            return;
        }
        self.intents.push(NotificationIntent {
            id: Uuid::new_v4(),
            document_id: self.document_id,
            recipient_id,
            kind,
            comment: self.comment.clone(),
        });
    }

    /// Author, main executor, delegate and co-executors.
    fn push_working_group(&mut self, document: &Correspondence, kind: NotificationKind) {
        self.push(Some(document.author_id), kind);
        self.push(document.main_executor_id, kind);
        self.push(document.internal_assignee_id, kind);
        for id in &document.co_executor_ids {
            self.push(Some(*id), kind);
        }
    }

    fn into_vec(self) -> Vec<NotificationIntent> {
        self.intents
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_audit_entry, build_notification_intents, describe_transition, NotificationKind,
        Transition,
    };
    use crate::model::correspondence::{Correspondence, CorrespondenceType, NewCorrespondence};
    use crate::model::role::Role;
    use crate::model::stage::{ActionName, Stage};
    use crate::model::user::Actor;
    use crate::workflow::action::{AssignmentRequest, WorkflowAction};

    fn document() -> Correspondence {
        let mut doc = Correspondence::new(
            NewCorrespondence {
                kind: CorrespondenceType::Outgoing,
                kartoteka: "OUT".to_string(),
                title: "Reply to ministry".to_string(),
                content: String::new(),
                source: "internal".to_string(),
                deadline: None,
            },
            1,
            0,
        );
        doc.id = 5;
        doc
    }

    #[test]
    fn audit_entry_records_actor_and_stages() {
        let actor = Actor::new(3, Role::Admin);
        let entry = build_audit_entry(
            "Cancelled",
            Some(&actor),
            Some("duplicate".to_string()),
            Some(Stage::Execution),
            Stage::Cancelled,
            42,
        );
        assert_eq!(entry.user_id, Some(3));
        assert_eq!(entry.details.as_deref(), Some("duplicate"));
        assert_eq!(entry.timestamp, 42);
        assert_eq!(entry.to_stage, Stage::Cancelled);

        let system = build_audit_entry("Imported", None, None, None, Stage::Registration, 1);
        assert!(system.user_id.is_none());
    }

    #[test]
    fn assignment_notifies_new_slots_but_not_the_actor() {
        let before = document();
        let mut after = before.clone();
        after.stage = Stage::Execution;
        after.main_executor_id = Some(10);
        after.co_executor_ids = vec![11, 2];
        after.contributor_ids = vec![12];
        let actor = Actor::new(2, Role::BankApparati);
        let action = WorkflowAction::AssignExecutors(AssignmentRequest {
            main_executor_id: 10,
            co_executor_ids: vec![11, 2],
            contributor_ids: vec![12],
        });

        let intents = build_notification_intents(&Transition {
            action: &action,
            actor: &actor,
            before: &before,
            after: &after,
        });
        let pairs: Vec<_> = intents
            .iter()
            .map(|intent| (intent.recipient_id, intent.kind))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (10, NotificationKind::MainExecutorAssigned),
                (11, NotificationKind::CoExecutorAssigned),
                (12, NotificationKind::ContributorAssigned),
            ]
        );
        assert!(intents.iter().all(|intent| intent.document_id == 5));
    }

    #[test]
    fn rejection_notifies_author_with_comment() {
        let mut before = document();
        before.stage = Stage::FinalReview;
        before.main_executor_id = Some(10);
        let mut after = before.clone();
        after.stage = Stage::RevisionRequested;
        let actor = Actor::new(20, Role::Tarmoq);
        let action = WorkflowAction::RejectReview {
            comment: "missing annex".to_string(),
        };

        let intents = build_notification_intents(&Transition {
            action: &action,
            actor: &actor,
            before: &before,
            after: &after,
        });
        assert_eq!(intents.len(), 2);
        assert!(intents.iter().all(|intent| {
            intent.kind == NotificationKind::RevisionRequested
                && intent.comment.as_deref() == Some("missing annex")
        }));
        assert_eq!(intents[0].recipient_id, 1);
    }

    #[test]
    fn descriptions_distinguish_first_assignment_from_reassignment() {
        assert_eq!(
            describe_transition(ActionName::AssignExecutors, Stage::Assignment, Stage::Execution),
            "Executors assigned; execution started"
        );
        assert_eq!(
            describe_transition(ActionName::AssignExecutors, Stage::Execution, Stage::Execution),
            "Executors reassigned"
        );
    }
}
