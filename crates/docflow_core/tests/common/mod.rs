#![allow(dead_code)]

use docflow_core::{
    Actor, AppliedTransition, AssignmentRequest, CorrespondenceType, Department, DirectoryProvider,
    DocumentId, DocumentStore, FixedClock, FunctionalRoleTag, InMemoryAuditSink,
    InMemoryDirectory, InMemoryDocumentStore, InMemoryNotificationSink, NewCorrespondence,
    ReviewDecision, Role, Stage, User, WorkflowAction, WorkflowConfig, WorkflowService,
    AuditSink, NotificationSink,
};
use std::sync::Arc;

pub const ADMIN: Actor = Actor {
    id: 1,
    role: Role::Admin,
};
pub const BOARD: Actor = Actor {
    id: 2,
    role: Role::Boshqaruv,
};
pub const OFFICE: Actor = Actor {
    id: 3,
    role: Role::BankApparati,
};
/// Head of the branch department (100).
pub const BRANCH_HEAD: Actor = Actor {
    id: 10,
    role: Role::Tarmoq,
};
pub const BRANCH_EMPLOYEE: Actor = Actor {
    id: 11,
    role: Role::Xodim,
};
pub const BRANCH_EMPLOYEE_2: Actor = Actor {
    id: 12,
    role: Role::Xodim,
};
/// Head of the credit department (300).
pub const CREDIT_HEAD: Actor = Actor {
    id: 30,
    role: Role::Tarmoq,
};
pub const CREDIT_EMPLOYEE: Actor = Actor {
    id: 31,
    role: Role::Xodim,
};
pub const OUTSIDER: Actor = Actor {
    id: 40,
    role: Role::Xodim,
};

pub const BRANCH_DEPARTMENT: i64 = 100;
pub const CREDIT_DEPARTMENT: i64 = 300;

pub const LEGAL: Actor = Actor {
    id: 20,
    role: Role::Xodim,
};
pub const COMPLIANCE: Actor = Actor {
    id: 21,
    role: Role::Xodim,
};
pub const APPARAT: Actor = Actor {
    id: 22,
    role: Role::Xodim,
};
pub const REVIEWERS: [Actor; 3] = [LEGAL, COMPLIANCE, APPARAT];

pub const START_MS: i64 = 1_700_000_000_000;

pub fn directory() -> InMemoryDirectory {
    let mut directory = InMemoryDirectory::new();
    for (actor, department_id) in [
        (ADMIN, None),
        (BOARD, None),
        (OFFICE, None),
        (BRANCH_HEAD, Some(BRANCH_DEPARTMENT)),
        (BRANCH_EMPLOYEE, Some(BRANCH_DEPARTMENT)),
        (BRANCH_EMPLOYEE_2, Some(BRANCH_DEPARTMENT)),
        (CREDIT_HEAD, Some(CREDIT_DEPARTMENT)),
        (CREDIT_EMPLOYEE, Some(CREDIT_DEPARTMENT)),
        (OUTSIDER, None),
    ] {
        directory.add_user(user(actor, department_id));
    }
    directory
        .add_department(department(BRANCH_DEPARTMENT, BRANCH_HEAD.id, None))
        .add_department(department(CREDIT_DEPARTMENT, CREDIT_HEAD.id, None));

    for (offset, (reviewer, tag)) in REVIEWERS
        .into_iter()
        .zip(["legal", "compliance", "apparat"])
        .enumerate()
    {
        let department_id = 200 + offset as i64;
        directory
            .add_user(user(reviewer, Some(department_id)))
            .add_department(department(department_id, reviewer.id, Some(tag)));
    }
    directory
}

fn user(actor: Actor, department_id: Option<i64>) -> User {
    User {
        id: actor.id,
        full_name: format!("user-{}", actor.id),
        role: actor.role,
        department_id,
    }
}

fn department(id: i64, head_user_id: i64, functional_role: Option<&str>) -> Department {
    Department {
        id,
        name: format!("department-{id}"),
        parent_id: None,
        head_user_id: Some(head_user_id),
        functional_role: functional_role.map(|tag| FunctionalRoleTag::new(tag).unwrap()),
    }
}

pub fn new_letter(title: &str) -> NewCorrespondence {
    NewCorrespondence {
        kind: CorrespondenceType::Incoming,
        kartoteka: "general".to_string(),
        title: title.to_string(),
        content: "Please review the attached request.".to_string(),
        source: "Central Bank".to_string(),
        deadline: None,
    }
}

pub fn assign_to(main_executor: Actor) -> WorkflowAction {
    WorkflowAction::AssignExecutors(AssignmentRequest {
        main_executor_id: main_executor.id,
        co_executor_ids: Vec::new(),
        contributor_ids: Vec::new(),
    })
}

/// In-memory collaborators kept outside the service so tests can inspect
/// them.
pub struct Fixture {
    pub store: InMemoryDocumentStore,
    pub directory: InMemoryDirectory,
    pub audit: InMemoryAuditSink,
    pub notifications: InMemoryNotificationSink,
    pub clock: Arc<FixedClock>,
}

pub type FixtureService<'a> = WorkflowService<
    &'a InMemoryDocumentStore,
    &'a InMemoryDirectory,
    &'a InMemoryAuditSink,
    &'a InMemoryNotificationSink,
>;

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: InMemoryDocumentStore::new(),
            directory: directory(),
            audit: InMemoryAuditSink::new(),
            notifications: InMemoryNotificationSink::new(),
            clock: Arc::new(FixedClock::new(START_MS)),
        }
    }

    pub fn service(&self) -> FixtureService<'_> {
        self.service_with(WorkflowConfig::default())
    }

    pub fn service_with(&self, config: WorkflowConfig) -> FixtureService<'_> {
        WorkflowService::new(
            config,
            &self.store,
            &self.directory,
            &self.audit,
            &self.notifications,
        )
        .with_clock(Arc::clone(&self.clock))
    }
}

/// Applies `action`, panicking with context on failure.
pub fn apply<S, D, A, N>(
    service: &WorkflowService<S, D, A, N>,
    id: DocumentId,
    actor: Actor,
    action: WorkflowAction,
) -> AppliedTransition
where
    S: DocumentStore,
    D: DirectoryProvider,
    A: AuditSink,
    N: NotificationSink,
{
    let name = action.name();
    service
        .apply_transition(id, &action, &actor)
        .unwrap_or_else(|err| panic!("{name} by {} failed: {err}", actor.id))
}

/// Registers a new document and walks the happy path until it sits in
/// `target`. Side stages are reached from a representative main-line stage.
pub fn document_in<S, D, A, N>(service: &WorkflowService<S, D, A, N>, target: Stage) -> DocumentId
where
    S: DocumentStore,
    D: DirectoryProvider,
    A: AuditSink,
    N: NotificationSink,
{
    let id = service
        .register_document(new_letter("Request for statement"), &OFFICE)
        .unwrap()
        .id;

    match target {
        Stage::OnHold => {
            advance(service, id, Stage::Execution);
            apply(service, id, ADMIN, WorkflowAction::Hold { reason: None });
        }
        Stage::Cancelled => {
            advance(service, id, Stage::Registration);
            apply(
                service,
                id,
                ADMIN,
                WorkflowAction::Cancel {
                    reason: "duplicate".to_string(),
                },
            );
        }
        Stage::Rejected => {
            advance(service, id, Stage::Registration);
            apply(
                service,
                id,
                ADMIN,
                WorkflowAction::Reject {
                    reason: "out of scope".to_string(),
                },
            );
        }
        Stage::RevisionRequested => {
            advance(service, id, Stage::FinalReview);
            service
                .record_decision(
                    id,
                    &LEGAL,
                    ReviewDecision::Reject,
                    Some("missing annex".to_string()),
                )
                .unwrap();
        }
        Stage::Archived => {
            advance(service, id, Stage::Completed);
            apply(service, id, ADMIN, WorkflowAction::Archive);
        }
        main_line => advance(service, id, main_line),
    }

    assert_eq!(service.get_document(id).unwrap().stage, target);
    id
}

/// Walks the main line from the current stage up to `target`.
pub fn advance<S, D, A, N>(service: &WorkflowService<S, D, A, N>, id: DocumentId, target: Stage)
where
    S: DocumentStore,
    D: DirectoryProvider,
    A: AuditSink,
    N: NotificationSink,
{
    loop {
        let stage = service.get_document(id).unwrap().stage;
        if stage == target {
            return;
        }
        match stage {
            Stage::PendingRegistration => {
                apply(service, id, OFFICE, WorkflowAction::Register);
            }
            Stage::Registration => {
                apply(service, id, OFFICE, WorkflowAction::SubmitForResolution);
            }
            Stage::Resolution => {
                apply(
                    service,
                    id,
                    BOARD,
                    WorkflowAction::Resolve {
                        resolution: "Prepare a reply".to_string(),
                    },
                );
            }
            Stage::Assignment => {
                apply(service, id, ADMIN, assign_to(BRANCH_HEAD));
            }
            Stage::Execution => {
                apply(service, id, BRANCH_HEAD, WorkflowAction::StartDrafting);
            }
            Stage::Drafting | Stage::RevisionRequested => {
                apply(service, id, BRANCH_HEAD, WorkflowAction::SubmitForReview);
            }
            Stage::FinalReview => {
                for reviewer in REVIEWERS {
                    service
                        .record_decision(id, &reviewer, ReviewDecision::Approve, None)
                        .unwrap();
                }
            }
            Stage::Signature => {
                apply(service, id, BOARD, WorkflowAction::Sign);
            }
            Stage::Dispatch => {
                apply(service, id, OFFICE, WorkflowAction::Dispatch);
            }
            other => panic!("cannot advance from {other} towards {target}"),
        }
    }
}
