//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `docflow_core` linkage end to end against in-memory SQLite.
//! - Keep output deterministic for quick local sanity checks.

use docflow_core::{
    open_db_in_memory, Actor, AssignmentRequest, CorrespondenceType, Department,
    FunctionalRoleTag, InMemoryDirectory, LogNotificationSink, NewCorrespondence, ReviewDecision,
    Role, SqliteAuditSink, SqliteDocumentStore, User, WorkflowAction, WorkflowConfig,
    WorkflowService,
};
use std::error::Error;
use std::process::ExitCode;

const ADMIN: Actor = Actor {
    id: 1,
    role: Role::Admin,
};
const BOARD: Actor = Actor {
    id: 2,
    role: Role::Boshqaruv,
};
const OFFICE: Actor = Actor {
    id: 3,
    role: Role::BankApparati,
};
const BRANCH_HEAD: Actor = Actor {
    id: 10,
    role: Role::Tarmoq,
};
const EMPLOYEE: Actor = Actor {
    id: 11,
    role: Role::Xodim,
};

fn main() -> ExitCode {
    println!("docflow_core ping={}", docflow_core::ping());
    println!("docflow_core version={}", docflow_core::core_version());

    match run_lifecycle_probe() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("probe failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_lifecycle_probe() -> Result<(), Box<dyn Error>> {
    let conn = open_db_in_memory()?;
    let directory = seed_directory()?;
    let service = WorkflowService::new(
        WorkflowConfig::default(),
        SqliteDocumentStore::new(&conn),
        directory,
        SqliteAuditSink::new(&conn),
        LogNotificationSink,
    );

    let document = service.register_document(
        NewCorrespondence {
            kind: CorrespondenceType::Incoming,
            kartoteka: "general".to_string(),
            title: "Probe letter".to_string(),
            content: "Lifecycle smoke test".to_string(),
            source: "cli".to_string(),
            deadline: None,
        },
        &OFFICE,
    )?;
    let id = document.id;
    println!("document id={id} stage={}", document.stage);

    let steps: Vec<(Actor, WorkflowAction)> = vec![
        (OFFICE, WorkflowAction::Register),
        (OFFICE, WorkflowAction::SubmitForResolution),
        (
            BOARD,
            WorkflowAction::Resolve {
                resolution: "Prepare a reply".to_string(),
            },
        ),
        (
            ADMIN,
            WorkflowAction::AssignExecutors(AssignmentRequest {
                main_executor_id: BRANCH_HEAD.id,
                co_executor_ids: Vec::new(),
                contributor_ids: Vec::new(),
            }),
        ),
        (
            BRANCH_HEAD,
            WorkflowAction::DelegateInternal {
                employee_id: EMPLOYEE.id,
            },
        ),
        (EMPLOYEE, WorkflowAction::StartDrafting),
        (BRANCH_HEAD, WorkflowAction::SubmitForReview),
    ];
    for (actor, action) in &steps {
        let applied = service.apply_transition(id, action, actor)?;
        println!(
            "action={} stage={} version={}",
            applied.action,
            applied.to_stage(),
            applied.document.version
        );
    }

    for reviewer_id in [20, 21, 22] {
        let reviewer = Actor::new(reviewer_id, Role::Xodim);
        let applied = service.record_decision(id, &reviewer, ReviewDecision::Approve, None)?;
        println!(
            "action={} reviewer={reviewer_id} stage={}",
            applied.action,
            applied.to_stage()
        );
    }

    for (actor, action) in [
        (BOARD, WorkflowAction::Sign),
        (OFFICE, WorkflowAction::Dispatch),
        (ADMIN, WorkflowAction::Archive),
    ] {
        let applied = service.apply_transition(id, &action, &actor)?;
        println!("action={} stage={}", applied.action, applied.to_stage());
    }

    let stored = service.get_document(id)?;
    println!(
        "final stage={} version={} audit_entries={}",
        stored.stage,
        stored.version,
        stored.audit_log.len()
    );
    Ok(())
}

fn seed_directory() -> Result<InMemoryDirectory, Box<dyn Error>> {
    let mut directory = InMemoryDirectory::new();
    for (actor, name, department_id) in [
        (ADMIN, "Registry Admin", None),
        (BOARD, "Board Member", None),
        (OFFICE, "Office Clerk", None),
        (BRANCH_HEAD, "Branch Head", Some(100)),
        (EMPLOYEE, "Branch Employee", Some(100)),
    ] {
        directory.add_user(User {
            id: actor.id,
            full_name: name.to_string(),
            role: actor.role,
            department_id,
        });
    }
    directory.add_department(Department {
        id: 100,
        name: "Branch".to_string(),
        parent_id: None,
        head_user_id: Some(BRANCH_HEAD.id),
        functional_role: None,
    });

    for (offset, tag) in ["legal", "compliance", "apparat"].into_iter().enumerate() {
        let department_id = 200 + offset as i64;
        let head_id = 20 + offset as i64;
        directory
            .add_department(Department {
                id: department_id,
                name: format!("{tag} department"),
                parent_id: None,
                head_user_id: Some(head_id),
                functional_role: Some(FunctionalRoleTag::new(tag)?),
            })
            .add_user(User {
                id: head_id,
                full_name: format!("{tag} head"),
                role: Role::Xodim,
                department_id: Some(department_id),
            });
    }
    Ok(directory)
}
