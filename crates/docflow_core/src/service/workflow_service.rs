//! Correspondence workflow use-case service.
//!
//! # Responsibility
//! - Drive one action through load, stage machine, compare-and-swap save,
//!   audit append and notification delivery.
//! - Lift store conflicts and missing documents into caller-facing errors.
//!
//! # Invariants
//! - A snapshot is written only when the stage machine accepted the action.
//! - Audit and notification sinks are fed only after the save committed.
//! - Notification delivery never fails a transition.
//! - Log lines carry ids, stages and action names only.

use crate::config::WorkflowConfig;
use crate::directory::DirectoryProvider;
use crate::model::correspondence::{
    AuditLogEntry, Correspondence, DocumentId, NewCorrespondence,
};
use crate::model::stage::{ActionName, Stage};
use crate::model::user::{Actor, UserId};
use crate::repo::document_repo::{DocumentListQuery, DocumentStore, RepoError};
use crate::repo::sinks::{AuditSink, NotificationSink};
use crate::service::clock::{Clock, SystemClock};
use crate::workflow::action::{AssignmentRequest, ReviewDecision, WorkflowAction};
use crate::workflow::error::TransitionError;
use crate::workflow::events::build_audit_entry;
use crate::workflow::machine::{AppliedTransition, StageMachine};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const CREATED_AUDIT_ACTION: &str = "Document created";

/// Service error for workflow use-cases.
#[derive(Debug)]
pub enum WorkflowError {
    /// The stage machine refused the action.
    Transition(TransitionError),
    /// Another writer saved the document after it was loaded.
    VersionConflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },
    /// Target document does not exist.
    DocumentNotFound(DocumentId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl WorkflowError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transition(err) => err.code(),
            Self::VersionConflict { .. } => "version_conflict",
            Self::DocumentNotFound(_) => "document_not_found",
            Self::Repo(_) => "repo_error",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }

    /// Refusals caused by the request or by concurrent users, not by faults.
    fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            Self::Transition(_) | Self::VersionConflict { .. } | Self::DocumentNotFound(_)
        )
    }

    /// Whether re-running the whole cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transition(err) => write!(f, "{err}"),
            Self::VersionConflict {
                document_id,
                expected,
                actual,
            } => write!(
                f,
                "document {document_id} was modified concurrently: expected version {expected}, found {actual}"
            ),
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent workflow state: {details}")
            }
        }
    }
}

impl Error for WorkflowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transition(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for WorkflowError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::DocumentNotFound(id),
            RepoError::VersionConflict {
                document_id,
                expected,
                actual,
            } => Self::VersionConflict {
                document_id,
                expected,
                actual,
            },
            other => Self::Repo(other),
        }
    }
}

impl From<TransitionError> for WorkflowError {
    fn from(value: TransitionError) -> Self {
        Self::Transition(value)
    }
}

/// Facade over the stage machine and its collaborators.
pub struct WorkflowService<S, D, A, N> {
    config: WorkflowConfig,
    store: S,
    directory: D,
    audit: A,
    notifier: N,
    clock: Box<dyn Clock + Send + Sync>,
}

impl<S, D, A, N> WorkflowService<S, D, A, N>
where
    S: DocumentStore,
    D: DirectoryProvider,
    A: AuditSink,
    N: NotificationSink,
{
    /// Creates a service reading time from the system clock.
    pub fn new(config: WorkflowConfig, store: S, directory: D, audit: A, notifier: N) -> Self {
        Self {
            config,
            store,
            directory,
            audit,
            notifier,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Creates a document in `PENDING_REGISTRATION` authored by `actor`.
    ///
    /// Returns the stored snapshot as read back from the store.
    pub fn register_document(
        &self,
        input: NewCorrespondence,
        actor: &Actor,
    ) -> Result<Correspondence, WorkflowError> {
        let started_at = Instant::now();
        let now = self.clock.now_ms();

        let mut document = Correspondence::new(input, actor.id, now);
        let audit_entry = build_audit_entry(
            CREATED_AUDIT_ACTION,
            Some(actor),
            None,
            None,
            Stage::PendingRegistration,
            now,
        );
        document.audit_log.push(audit_entry.clone());

        let result = self
            .store
            .insert(&document)
            .map_err(WorkflowError::from)
            .and_then(|id| {
                self.append_audit(id, &audit_entry);
                self.store.load(id).map_err(|err| match err {
                    RepoError::NotFound(_) => WorkflowError::InconsistentState(
                        "created document not found in read-back",
                    ),
                    other => other.into(),
                })
            });

        match &result {
            Ok(created) => info!(
                "event=document_register module=workflow status=ok document_id={} author_id={} duration_ms={}",
                created.id,
                actor.id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=document_register module=workflow status=error author_id={} duration_ms={} error_code={} error={}",
                actor.id,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }

    /// Applies one action to a stored document.
    ///
    /// Runs a single load/apply/save cycle. A concurrent writer surfaces as
    /// [`WorkflowError::VersionConflict`]; see
    /// [`Self::apply_transition_with_retry`].
    pub fn apply_transition(
        &self,
        document_id: DocumentId,
        action: &WorkflowAction,
        actor: &Actor,
    ) -> Result<AppliedTransition, WorkflowError> {
        let started_at = Instant::now();
        let result = self.try_apply(document_id, action, actor);
        let duration_ms = started_at.elapsed().as_millis();

        match &result {
            Ok(applied) => info!(
                "event=transition_apply module=workflow status=ok document_id={} action={} actor_id={} from={} to={} version={} notifications={} duration_ms={}",
                document_id,
                applied.action.as_str(),
                actor.id,
                applied.from_stage,
                applied.to_stage(),
                applied.document.version,
                applied.notifications.len(),
                duration_ms
            ),
            Err(err) if err.is_business_outcome() => warn!(
                "event=transition_apply module=workflow status=rejected document_id={} action={} actor_id={} duration_ms={} error_code={}",
                document_id,
                action.name().as_str(),
                actor.id,
                duration_ms,
                err.code()
            ),
            Err(err) => error!(
                "event=transition_apply module=workflow status=error document_id={} action={} actor_id={} duration_ms={} error_code={} error={}",
                document_id,
                action.name().as_str(),
                actor.id,
                duration_ms,
                err.code(),
                err
            ),
        }
        result
    }

    /// Like [`Self::apply_transition`], re-running the whole cycle on
    /// version conflicts up to `max_attempts` times in total.
    ///
    /// Every other error is returned on first occurrence. An attempt count
    /// of zero is treated as one.
    pub fn apply_transition_with_retry(
        &self,
        document_id: DocumentId,
        action: &WorkflowAction,
        actor: &Actor,
        max_attempts: u32,
    ) -> Result<AppliedTransition, WorkflowError> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.apply_transition(document_id, action, actor) {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    info!(
                        "event=transition_retry module=workflow status=retrying document_id={} action={} attempt={} max_attempts={}",
                        document_id,
                        action.name().as_str(),
                        attempt,
                        max_attempts
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Records one reviewer verdict in `FINAL_REVIEW`.
    pub fn record_decision(
        &self,
        document_id: DocumentId,
        reviewer: &Actor,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<AppliedTransition, WorkflowError> {
        self.apply_transition(
            document_id,
            &WorkflowAction::review(decision, comment),
            reviewer,
        )
    }

    /// Assigns the main executor and co-executor/contributor lists.
    pub fn assign_executors(
        &self,
        document_id: DocumentId,
        request: AssignmentRequest,
        actor: &Actor,
    ) -> Result<AppliedTransition, WorkflowError> {
        self.apply_transition(document_id, &WorkflowAction::AssignExecutors(request), actor)
    }

    /// Delegates the work to an employee of the main executor's department.
    pub fn delegate_internal(
        &self,
        document_id: DocumentId,
        employee_id: UserId,
        actor: &Actor,
    ) -> Result<AppliedTransition, WorkflowError> {
        self.apply_transition(
            document_id,
            &WorkflowAction::DelegateInternal { employee_id },
            actor,
        )
    }

    pub fn get_document(&self, document_id: DocumentId) -> Result<Correspondence, WorkflowError> {
        Ok(self.store.load(document_id)?)
    }

    /// Lists documents ordered by most recent update first.
    pub fn list_documents(
        &self,
        query: &DocumentListQuery,
    ) -> Result<Vec<Correspondence>, WorkflowError> {
        Ok(self.store.list(query)?)
    }

    /// Actions `actor` may currently request on the document, payload aside.
    pub fn allowed_actions(
        &self,
        document_id: DocumentId,
        actor: &Actor,
    ) -> Result<Vec<ActionName>, WorkflowError> {
        let document = self.store.load(document_id)?;
        Ok(self.machine().allowed_actions(&document, actor))
    }

    fn machine(&self) -> StageMachine<'_, D> {
        StageMachine::new(&self.config, &self.directory)
    }

    fn try_apply(
        &self,
        document_id: DocumentId,
        action: &WorkflowAction,
        actor: &Actor,
    ) -> Result<AppliedTransition, WorkflowError> {
        let current = self.store.load(document_id)?;
        let mut applied = self
            .machine()
            .apply(&current, action, actor, self.clock.now_ms())?;

        applied.document.version = self.store.save(&applied.document, current.version)?;

        self.append_audit(document_id, &applied.audit_entry);
        if !applied.notifications.is_empty() {
            if let Err(err) = self.notifier.deliver(&applied.notifications) {
                warn!(
                    "event=notification_deliver module=workflow status=error document_id={} count={} error={}",
                    document_id,
                    applied.notifications.len(),
                    err
                );
            }
        }

        Ok(applied)
    }

    // The snapshot already carries the entry; the sink is a secondary copy.
    fn append_audit(&self, document_id: DocumentId, entry: &AuditLogEntry) {
        if let Err(err) = self.audit.append(document_id, entry) {
            error!(
                "event=audit_append module=workflow status=error document_id={} audit_id={} error={}",
                document_id, entry.id, err
            );
        }
    }
}
