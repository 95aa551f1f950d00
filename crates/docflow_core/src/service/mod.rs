//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, directory and sinks around the pure stage machine.
//! - Keep REST/UI callers decoupled from storage details.

pub mod clock;
pub mod workflow_service;
