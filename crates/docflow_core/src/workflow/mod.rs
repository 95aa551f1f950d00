//! Document workflow core.
//!
//! # Responsibility
//! - Decide which transitions are legal and who may request them.
//! - Run reviewer consensus and executor assignment rules.
//! - Describe every applied transition as audit and notification records.
//!
//! # Invariants
//! - Nothing in this module performs I/O; persistence and delivery belong to
//!   `repo` and `service`.

pub mod action;
pub mod assignment;
pub mod consensus;
pub mod error;
pub mod events;
pub mod machine;
