//! Domain model for correspondence workflow.
//!
//! # Responsibility
//! - Define the document aggregate, its reviewer list and audit trail.
//! - Define closed enums for stages, actions and organizational roles.
//!
//! # Invariants
//! - Every document is identified by a store-assigned integer `DocumentId`.
//! - Users and departments are referenced by id, never owned.

pub mod correspondence;
pub mod role;
pub mod stage;
pub mod user;
