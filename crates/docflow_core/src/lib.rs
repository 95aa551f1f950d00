//! Core domain logic for the correspondence workflow.
//! This crate is the single source of truth for lifecycle invariants.

pub mod config;
pub mod db;
pub mod directory;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod workflow;

pub use config::{ArchivePolicy, ConfigError, DuplicateAssignmentPolicy, WorkflowConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use directory::{DirectoryProvider, InMemoryDirectory};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::correspondence::{
    AuditLogEntry, Correspondence, CorrespondenceType, CorrespondenceValidationError, DocumentId,
    NewCorrespondence, ReviewStatus, Reviewer,
};
pub use model::role::{FunctionalRoleTag, Role, RoleError};
pub use model::stage::{ActionName, Stage};
pub use model::user::{Actor, Department, DepartmentId, User, UserId};
pub use repo::document_repo::{
    DocumentListQuery, DocumentStore, RepoError, RepoResult, SqliteDocumentStore,
};
pub use repo::memory_store::InMemoryDocumentStore;
pub use repo::sinks::{
    AuditSink, InMemoryAuditSink, InMemoryNotificationSink, LogNotificationSink,
    NotificationSink, SqliteAuditSink,
};
pub use service::clock::{Clock, FixedClock, SystemClock};
pub use service::workflow_service::{WorkflowError, WorkflowService};
pub use workflow::action::{AssignmentRequest, ReviewDecision, WorkflowAction};
pub use workflow::error::TransitionError;
pub use workflow::events::{NotificationIntent, NotificationKind};
pub use workflow::machine::{AppliedTransition, StageMachine};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
