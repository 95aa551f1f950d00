//! Document lifecycle stage machine.
//!
//! # Responsibility
//! - Own the (stage, action) transition table.
//! - Evaluate the guard of every action against the acting user.
//! - Compute the next snapshot plus its audit entry and notification intents.
//!
//! # Invariants
//! - `apply` never mutates its input; failures leave the caller's snapshot
//!   exactly as it was.
//! - Stage legality is checked before the guard, the guard before payload
//!   validation.
//! - Every successful call appends exactly one audit entry.
//! - Audit timestamps never go backwards within one document.

use crate::config::{ArchivePolicy, WorkflowConfig};
use crate::directory::DirectoryProvider;
use crate::model::correspondence::{
    AuditLogEntry, Correspondence, CorrespondenceValidationError,
};
use crate::model::stage::{ActionName, Stage};
use crate::model::user::Actor;
use crate::workflow::action::{ReviewDecision, WorkflowAction};
use crate::workflow::assignment::{apply_assignment, resolve_assignment, resolve_delegate};
use crate::workflow::consensus::{initialize_reviewers, record_decision, ConsensusOutcome};
use crate::workflow::error::TransitionError;
use crate::workflow::events::{
    build_audit_entry, build_notification_intents, describe_transition, NotificationIntent,
    Transition,
};

/// Returns whether `action` may be requested while the document is in
/// `stage`. Guards are evaluated separately.
pub fn is_legal_from(action: ActionName, stage: Stage, archive_policy: ArchivePolicy) -> bool {
    match action {
        ActionName::Register => stage == Stage::PendingRegistration,
        ActionName::SubmitForResolution => stage == Stage::Registration,
        ActionName::Resolve => stage == Stage::Resolution,
        ActionName::AssignExecutors => stage.precedes_execution() || stage == Stage::Execution,
        ActionName::DelegateInternal | ActionName::StartDrafting => stage == Stage::Execution,
        ActionName::SubmitForReview => matches!(
            stage,
            Stage::Execution | Stage::Drafting | Stage::RevisionRequested
        ),
        ActionName::ApproveReview | ActionName::RejectReview => stage == Stage::FinalReview,
        ActionName::Sign => stage == Stage::Signature,
        ActionName::Dispatch => stage == Stage::Dispatch,
        ActionName::Hold | ActionName::Reject => stage.is_active(),
        ActionName::Resume => stage == Stage::OnHold,
        ActionName::Cancel | ActionName::UpdateDeadline => stage.is_open(),
        ActionName::Archive => match archive_policy {
            ArchivePolicy::CompletedOnly => stage == Stage::Completed,
            ArchivePolicy::AnyTerminal => stage.is_terminal() && stage != Stage::Archived,
        },
        ActionName::Unarchive => stage == Stage::Archived,
    }
}

/// Result of one successfully applied action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    pub action: ActionName,
    pub from_stage: Stage,
    /// New snapshot; already contains `audit_entry` at the end of its log.
    pub document: Correspondence,
    pub audit_entry: AuditLogEntry,
    pub notifications: Vec<NotificationIntent>,
}

impl AppliedTransition {
    pub fn to_stage(&self) -> Stage {
        self.document.stage
    }

    pub fn changed_stage(&self) -> bool {
        self.from_stage != self.document.stage
    }
}

/// Pure transition function over (snapshot, action, actor).
pub struct StageMachine<'a, D: DirectoryProvider + ?Sized> {
    config: &'a WorkflowConfig,
    directory: &'a D,
}

impl<'a, D: DirectoryProvider + ?Sized> StageMachine<'a, D> {
    pub fn new(config: &'a WorkflowConfig, directory: &'a D) -> Self {
        Self { config, directory }
    }

    /// Checks stage legality and the guard, ignoring payload.
    pub fn check(
        &self,
        document: &Correspondence,
        action: ActionName,
        actor: &Actor,
    ) -> Result<(), TransitionError> {
        if !is_legal_from(action, document.stage, self.config.archive_policy) {
            return Err(TransitionError::TransitionDenied {
                stage: document.stage,
                action,
            });
        }
        self.guard(document, action, actor)
    }

    /// Actions whose stage rule and guard pass for `actor` right now.
    pub fn allowed_actions(&self, document: &Correspondence, actor: &Actor) -> Vec<ActionName> {
        ActionName::ALL
            .into_iter()
            .filter(|action| self.check(document, *action, actor).is_ok())
            .collect()
    }

    /// Applies `action` to `document` on behalf of `actor` at time `at`
    /// (epoch milliseconds).
    pub fn apply(
        &self,
        document: &Correspondence,
        action: &WorkflowAction,
        actor: &Actor,
        at: i64,
    ) -> Result<AppliedTransition, TransitionError> {
        let name = action.name();
        let from_stage = document.stage;
        self.check(document, name, actor)?;

        let mut next = document.clone();
        let details = self.apply_effect(&mut next, action, actor)?;

        if next.stage != from_stage {
            next.stage_deadline = None;
        }

        let timestamp = document
            .last_audit_timestamp()
            .map_or(at, |last| last.max(at));
        let audit_entry = build_audit_entry(
            describe_transition(name, from_stage, next.stage),
            Some(actor),
            details,
            Some(from_stage),
            next.stage,
            timestamp,
        );
        next.audit_log.push(audit_entry.clone());
        next.validate()?;

        let notifications = build_notification_intents(&Transition {
            action,
            actor,
            before: document,
            after: &next,
        });

        Ok(AppliedTransition {
            action: name,
            from_stage,
            document: next,
            audit_entry,
            notifications,
        })
    }

    fn guard(
        &self,
        document: &Correspondence,
        action: ActionName,
        actor: &Actor,
    ) -> Result<(), TransitionError> {
        let allowed = match action {
            ActionName::Register
            | ActionName::SubmitForResolution
            | ActionName::AssignExecutors
            | ActionName::Hold
            | ActionName::Resume
            | ActionName::Cancel
            | ActionName::Reject
            | ActionName::Archive
            | ActionName::Unarchive
            | ActionName::UpdateDeadline => self.config.is_managing(actor.role),
            ActionName::Resolve => self.config.is_resolving(actor.role),
            ActionName::DelegateInternal => {
                document.main_executor_id == Some(actor.id)
                    && actor.role == self.config.delegating_role
            }
            ActionName::StartDrafting => {
                document.main_executor_id == Some(actor.id)
                    || document.internal_assignee_id == Some(actor.id)
            }
            ActionName::SubmitForReview => {
                document.main_executor_id == Some(actor.id) || document.author_id == actor.id
            }
            ActionName::ApproveReview | ActionName::RejectReview => {
                if !document.has_pending_review_from(actor.id) {
                    return Err(TransitionError::NotAReviewer(actor.id));
                }
                true
            }
            ActionName::Sign => actor.role == self.config.signing_role,
            ActionName::Dispatch => actor.role == self.config.dispatch_role,
        };

        if allowed {
            Ok(())
        } else {
            Err(TransitionError::NotAuthorized {
                action,
                actor_id: actor.id,
                role: actor.role,
            })
        }
    }

    /// Mutates `next` according to `action`; returns audit details.
    fn apply_effect(
        &self,
        next: &mut Correspondence,
        action: &WorkflowAction,
        actor: &Actor,
    ) -> Result<Option<String>, TransitionError> {
        let details = match action {
            WorkflowAction::Register => {
                next.stage = Stage::Registration;
                None
            }
            WorkflowAction::SubmitForResolution => {
                next.stage = Stage::Resolution;
                None
            }
            WorkflowAction::Resolve { resolution } => {
                let resolution = required_text(resolution, ActionName::Resolve)?;
                next.resolution = Some(resolution.clone());
                next.stage = Stage::Assignment;
                Some(resolution)
            }
            WorkflowAction::AssignExecutors(request) => {
                let resolved = resolve_assignment(
                    request,
                    self.config.duplicate_assignment,
                    self.directory,
                )?;
                apply_assignment(next, resolved);
                Some(format!(
                    "main_executor={} co_executors={:?} contributors={:?}",
                    request.main_executor_id, next.co_executor_ids, next.contributor_ids
                ))
            }
            WorkflowAction::DelegateInternal { employee_id } => {
                let employee = resolve_delegate(actor, *employee_id, self.directory)?;
                next.internal_assignee_id = Some(employee.id);
                Some(format!("internal_assignee={}", employee.id))
            }
            WorkflowAction::StartDrafting => {
                next.stage = Stage::Drafting;
                None
            }
            WorkflowAction::SubmitForReview => {
                next.reviewers =
                    initialize_reviewers(&self.config.required_reviewer_roles, self.directory)?;
                next.stage = Stage::FinalReview;
                None
            }
            WorkflowAction::ApproveReview { comment } => {
                self.decide(next, actor, ReviewDecision::Approve, comment.as_deref())?;
                optional_text(comment.as_deref())
            }
            WorkflowAction::RejectReview { comment } => {
                self.decide(next, actor, ReviewDecision::Reject, Some(comment))?;
                Some(comment.trim().to_string())
            }
            WorkflowAction::Sign => {
                next.stage = Stage::Dispatch;
                None
            }
            WorkflowAction::Dispatch => {
                next.stage = Stage::Completed;
                None
            }
            WorkflowAction::Hold { reason } => {
                next.prior_stage = Some(next.stage);
                next.stage = Stage::OnHold;
                reason.clone()
            }
            WorkflowAction::Resume | WorkflowAction::Unarchive => {
                next.stage = restore_prior_stage(next)?;
                None
            }
            WorkflowAction::Cancel { reason } => {
                let reason = required_text(reason, ActionName::Cancel)?;
                close(next, Stage::Cancelled);
                Some(reason)
            }
            WorkflowAction::Reject { reason } => {
                let reason = required_text(reason, ActionName::Reject)?;
                close(next, Stage::Rejected);
                Some(reason)
            }
            WorkflowAction::Archive => {
                next.prior_stage = Some(next.stage);
                next.stage = Stage::Archived;
                None
            }
            WorkflowAction::UpdateDeadline { deadline } => {
                if let Some(value) = deadline {
                    if *value < next.created_at {
                        return Err(TransitionError::InvalidDeadline(*value));
                    }
                }
                next.deadline = *deadline;
                Some(match deadline {
                    Some(value) => format!("deadline={value}"),
                    None => "deadline cleared".to_string(),
                })
            }
        };
        Ok(details)
    }

    fn decide(
        &self,
        next: &mut Correspondence,
        actor: &Actor,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> Result<(), TransitionError> {
        match record_decision(&mut next.reviewers, actor.id, decision, comment)? {
            ConsensusOutcome::Pending => {}
            ConsensusOutcome::Reached => next.stage = Stage::Signature,
            ConsensusOutcome::Bounced => {
                next.stage = Stage::RevisionRequested;
                next.reviewers.clear();
            }
        }
        Ok(())
    }
}

fn required_text(value: &str, action: ActionName) -> Result<String, TransitionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransitionError::CommentRequired(action));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn restore_prior_stage(next: &mut Correspondence) -> Result<Stage, TransitionError> {
    next.prior_stage
        .take()
        .ok_or(TransitionError::InvalidDocument(
            CorrespondenceValidationError::InvalidPriorStage(None),
        ))
}

/// Moves an open document to a terminal stage and drops open review state.
fn close(next: &mut Correspondence, terminal: Stage) {
    next.stage = terminal;
    next.prior_stage = None;
    next.reviewers.retain(|reviewer| !reviewer.is_pending());
}
