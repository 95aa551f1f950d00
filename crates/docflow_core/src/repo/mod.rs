//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the document store and sink contracts consumed by the service.
//! - Keep SQLite details inside the core persistence boundary.
//!
//! # Invariants
//! - Stores enforce `Correspondence::validate()` on every write and read.
//! - Concurrent modification surfaces as `RepoError::VersionConflict`, never
//!   as a silent overwrite.

pub mod document_repo;
pub mod memory_store;
pub mod sinks;
