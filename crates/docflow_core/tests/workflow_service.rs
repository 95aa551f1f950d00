mod common;

use common::{
    apply, document_in, new_letter, Fixture, ADMIN, BOARD, BRANCH_HEAD, LEGAL, OFFICE, REVIEWERS,
    START_MS,
};
use docflow_core::db::open_db_in_memory;
use docflow_core::{
    ArchivePolicy, Correspondence, CorrespondenceValidationError, DocumentId, DocumentListQuery,
    DocumentStore, FixedClock, InMemoryAuditSink, InMemoryDocumentStore, NotificationIntent,
    NotificationSink, RepoError, RepoResult, ReviewDecision, SqliteAuditSink,
    SqliteDocumentStore, Stage, WorkflowAction, WorkflowConfig, WorkflowError, WorkflowService,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;

/// Store that lets another writer slip in before the next save.
struct InterferingStore {
    inner: InMemoryDocumentStore,
    interfere: AtomicBool,
}

impl InterferingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            interfere: AtomicBool::new(false),
        }
    }
}

impl DocumentStore for InterferingStore {
    fn insert(&self, document: &Correspondence) -> RepoResult<DocumentId> {
        self.inner.insert(document)
    }

    fn load(&self, id: DocumentId) -> RepoResult<Correspondence> {
        self.inner.load(id)
    }

    fn save(&self, document: &Correspondence, expected_version: u64) -> RepoResult<u64> {
        if self.interfere.swap(false, Ordering::SeqCst) {
            let current = self.inner.load(document.id)?;
            self.inner.save(&current, current.version)?;
        }
        self.inner.save(document, expected_version)
    }

    fn list(&self, query: &DocumentListQuery) -> RepoResult<Vec<Correspondence>> {
        self.inner.list(query)
    }
}

struct FailingNotificationSink;

impl NotificationSink for FailingNotificationSink {
    fn deliver(&self, _intents: &[NotificationIntent]) -> RepoResult<()> {
        Err(RepoError::InvalidData("mail gateway offline".to_string()))
    }
}

#[test]
fn register_document_creates_audited_pending_document() {
    let fixture = Fixture::new();
    let service = fixture.service();

    let created = service
        .register_document(new_letter("Inquiry about account"), &OFFICE)
        .unwrap();

    assert!(created.id > 0);
    assert_eq!(created.version, 1);
    assert_eq!(created.stage, Stage::PendingRegistration);
    assert_eq!(created.author_id, OFFICE.id);
    assert_eq!(created.created_at, START_MS);
    assert_eq!(created.audit_log.len(), 1);
    assert_eq!(created.audit_log[0].action, "Document created");
    assert_eq!(created.audit_log[0].user_id, Some(OFFICE.id));
    assert_eq!(created.audit_log[0].from_stage, None);

    let appended = fixture.audit.entries();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].0, created.id);
    assert_eq!(appended[0].1, created.audit_log[0]);
}

#[test]
fn register_document_rejects_blank_title() {
    let fixture = Fixture::new();
    let service = fixture.service();

    let err = service
        .register_document(new_letter("  "), &OFFICE)
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Repo(RepoError::Validation(CorrespondenceValidationError::EmptyTitle))
    ));
    assert!(fixture.audit.entries().is_empty());
}

#[test]
fn full_lifecycle_on_sqlite_keeps_audit_table_in_step() {
    let conn = open_db_in_memory().unwrap();
    let directory = common::directory();
    let service = WorkflowService::new(
        WorkflowConfig::default(),
        SqliteDocumentStore::new(&conn),
        &directory,
        SqliteAuditSink::new(&conn),
        docflow_core::LogNotificationSink,
    )
    .with_clock(FixedClock::new(START_MS));

    let id = document_in(&service, Stage::Completed);
    let archived = apply(&service, id, ADMIN, WorkflowAction::Archive);
    assert_eq!(archived.to_stage(), Stage::Archived);

    let stored = service.get_document(id).unwrap();
    let audit_rows = SqliteAuditSink::new(&conn).entries_for(id).unwrap();
    assert_eq!(audit_rows.len(), stored.audit_log.len());
    let actions: Vec<_> = stored
        .audit_log
        .iter()
        .map(|entry| entry.action.as_str())
        .collect();
    assert_eq!(
        actions,
        vec![
            "Document created",
            "Document registered",
            "Sent for resolution",
            "Resolution issued",
            "Executors assigned; execution started",
            "Drafting started",
            "Submitted for final review",
            "Review approved",
            "Review approved",
            "Review approved; all reviewers agreed",
            "Signed",
            "Dispatched",
            "Archived",
        ]
    );
    assert_eq!(stored.version, actions.len() as u64);
}

#[test]
fn missing_document_is_reported() {
    let fixture = Fixture::new();
    let service = fixture.service();

    assert!(matches!(
        service.apply_transition(404, &WorkflowAction::Register, &OFFICE),
        Err(WorkflowError::DocumentNotFound(404))
    ));
    assert!(matches!(
        service.allowed_actions(404, &OFFICE),
        Err(WorkflowError::DocumentNotFound(404))
    ));
    assert!(matches!(
        service.get_document(404),
        Err(WorkflowError::DocumentNotFound(404))
    ));
}

#[test]
fn failed_transition_writes_nothing() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let id = document_in(&service, Stage::Signature);
    let audit_before = fixture.audit.entries().len();
    let notified_before = fixture.notifications.delivered().len();
    let before = service.get_document(id).unwrap();

    assert!(service
        .apply_transition(id, &WorkflowAction::Sign, &OFFICE)
        .is_err());

    assert_eq!(service.get_document(id).unwrap(), before);
    assert_eq!(fixture.audit.entries().len(), audit_before);
    assert_eq!(fixture.notifications.delivered().len(), notified_before);
}

#[test]
fn sinks_receive_each_applied_transition() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let id = document_in(&service, Stage::Drafting);
    let audit_before = fixture.audit.entries().len();

    let applied = apply(&service, id, BRANCH_HEAD, WorkflowAction::SubmitForReview);

    let audit = fixture.audit.entries();
    assert_eq!(audit.len(), audit_before + 1);
    assert_eq!(audit.last().unwrap().1, applied.audit_entry);

    let delivered = fixture.notifications.delivered();
    let review_requests: Vec<_> = delivered
        .iter()
        .filter(|intent| intent.document_id == id)
        .filter(|intent| applied.notifications.contains(intent))
        .collect();
    assert_eq!(review_requests.len(), REVIEWERS.len());
}

#[test]
fn notification_failure_does_not_fail_transition() {
    let store = InMemoryDocumentStore::new();
    let directory = common::directory();
    let audit = InMemoryAuditSink::new();
    let service = WorkflowService::new(
        WorkflowConfig::default(),
        &store,
        &directory,
        &audit,
        FailingNotificationSink,
    );
    let id = document_in(&service, Stage::Drafting);

    let applied = apply(&service, id, BRANCH_HEAD, WorkflowAction::SubmitForReview);
    assert!(!applied.notifications.is_empty());
    assert_eq!(store.load(id).unwrap().stage, Stage::FinalReview);
}

#[test]
fn version_conflict_surfaces_without_retry() {
    let store = InterferingStore::new();
    let directory = common::directory();
    let audit = InMemoryAuditSink::new();
    let notifications = docflow_core::InMemoryNotificationSink::new();
    let service = WorkflowService::new(
        WorkflowConfig::default(),
        &store,
        &directory,
        &audit,
        &notifications,
    );
    let id = document_in(&service, Stage::Registration);
    let version = store.load(id).unwrap().version;

    store.interfere.store(true, Ordering::SeqCst);
    let err = service
        .apply_transition(id, &WorkflowAction::SubmitForResolution, &OFFICE)
        .unwrap_err();
    match err {
        WorkflowError::VersionConflict {
            document_id,
            expected,
            actual,
        } => {
            assert_eq!(document_id, id);
            assert_eq!(expected, version);
            assert_eq!(actual, version + 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.load(id).unwrap().stage, Stage::Registration);
    assert_eq!(
        audit.entries().len(),
        store.load(id).unwrap().audit_log.len()
    );
}

#[test]
fn retry_reruns_the_whole_cycle_after_conflict() {
    let store = InterferingStore::new();
    let directory = common::directory();
    let audit = InMemoryAuditSink::new();
    let notifications = docflow_core::InMemoryNotificationSink::new();
    let service = WorkflowService::new(
        WorkflowConfig::default(),
        &store,
        &directory,
        &audit,
        &notifications,
    );
    let id = document_in(&service, Stage::Registration);

    store.interfere.store(true, Ordering::SeqCst);
    let applied = service
        .apply_transition_with_retry(id, &WorkflowAction::SubmitForResolution, &OFFICE, 3)
        .unwrap();
    assert_eq!(applied.to_stage(), Stage::Resolution);

    let stored = store.load(id).unwrap();
    assert_eq!(stored.version, applied.document.version);
    assert_eq!(
        stored
            .audit_log
            .iter()
            .filter(|entry| entry.action == "Sent for resolution")
            .count(),
        1
    );

    // Business errors are not retried.
    store.interfere.store(true, Ordering::SeqCst);
    let err = service
        .apply_transition_with_retry(id, &WorkflowAction::Sign, &BOARD, 5)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Transition(_)));
    assert!(store.interfere.load(Ordering::SeqCst));
}

#[test]
fn concurrent_approvals_reach_signature_exactly_once() {
    let fixture = Fixture::new();
    let service = fixture.service();

    for _ in 0..10 {
        let id = document_in(&service, Stage::FinalReview);
        let version_before = service.get_document(id).unwrap().version;
        let barrier = Barrier::new(REVIEWERS.len());

        let outcomes: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = REVIEWERS
                .iter()
                .map(|reviewer| {
                    let service = &service;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        service.apply_transition_with_retry(
                            id,
                            &WorkflowAction::review(ReviewDecision::Approve, None),
                            reviewer,
                            REVIEWERS.len() as u32 + 2,
                        )
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap().unwrap())
                .collect()
        });

        let reached_signature = outcomes
            .iter()
            .filter(|applied| applied.to_stage() == Stage::Signature)
            .count();
        assert_eq!(reached_signature, 1);

        let stored = service.get_document(id).unwrap();
        assert_eq!(stored.stage, Stage::Signature);
        assert_eq!(stored.version, version_before + REVIEWERS.len() as u64);
        assert_eq!(
            stored
                .audit_log
                .iter()
                .filter(|entry| entry.to_stage == Stage::Signature)
                .count(),
            1
        );
    }
}

#[test]
fn list_documents_filters_through_the_store() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let drafting = document_in(&service, Stage::Drafting);
    let pending = document_in(&service, Stage::PendingRegistration);

    let in_drafting = service
        .list_documents(&DocumentListQuery {
            stage: Some(Stage::Drafting),
            ..DocumentListQuery::default()
        })
        .unwrap();
    assert_eq!(in_drafting.len(), 1);
    assert_eq!(in_drafting[0].id, drafting);

    let all: Vec<_> = service
        .list_documents(&DocumentListQuery::default())
        .unwrap()
        .into_iter()
        .map(|document| document.id)
        .collect();
    assert_eq!(all, vec![pending, drafting]);
}

#[test]
fn json_config_drives_policies() {
    let config = WorkflowConfig::from_json_str(
        r#"{
            "required_reviewer_roles": ["legal"],
            "archive_policy": "any_terminal"
        }"#,
    )
    .unwrap();
    assert_eq!(config.archive_policy, ArchivePolicy::AnyTerminal);

    let fixture = Fixture::new();
    let service = fixture.service_with(config);
    let id = document_in(&service, Stage::FinalReview);
    let signed = service
        .record_decision(id, &LEGAL, ReviewDecision::Approve, None)
        .unwrap();
    assert_eq!(signed.to_stage(), Stage::Signature);

    let cancelled = document_in(&service, Stage::Cancelled);
    let archived = apply(&service, cancelled, BOARD, WorkflowAction::Archive);
    assert_eq!(archived.to_stage(), Stage::Archived);
}
