//! Workflow configuration.
//!
//! # Responsibility
//! - Hold the role mapping and policies consumed by the stage machine.
//! - Parse and validate JSON configuration supplied by the host process.
//!
//! # Invariants
//! - `required_reviewer_roles` is non-empty and duplicate-free.
//! - `managing_roles` is non-empty.

use crate::model::role::{FunctionalRoleTag, Role};
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which terminal stages may be archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchivePolicy {
    #[default]
    CompletedOnly,
    AnyTerminal,
}

/// How overlapping executor/co-executor/contributor lists are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAssignmentPolicy {
    /// Fail with `DuplicateAssignment`.
    #[default]
    Reject,
    /// Drop the lower-priority occurrence silently.
    Deduplicate,
}

/// Role mapping and policies for the stage machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Functional positions whose holders review every document, in order.
    pub required_reviewer_roles: Vec<FunctionalRoleTag>,
    /// Roles allowed to register, assign, hold, cancel and archive.
    pub managing_roles: Vec<Role>,
    /// Roles allowed to write the resolution.
    pub resolving_roles: Vec<Role>,
    pub signing_role: Role,
    pub dispatch_role: Role,
    /// Role a main executor needs to delegate inside the department.
    pub delegating_role: Role,
    pub archive_policy: ArchivePolicy,
    pub duplicate_assignment: DuplicateAssignmentPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            required_reviewer_roles: ["legal", "compliance", "apparat"]
                .into_iter()
                .filter_map(|tag| FunctionalRoleTag::new(tag).ok())
                .collect(),
            managing_roles: vec![Role::Admin, Role::Boshqaruv, Role::BankApparati],
            resolving_roles: vec![Role::Boshqaruv, Role::Admin],
            signing_role: Role::Boshqaruv,
            dispatch_role: Role::BankApparati,
            delegating_role: Role::Tarmoq,
            archive_policy: ArchivePolicy::default(),
            duplicate_assignment: DuplicateAssignmentPolicy::default(),
        }
    }
}

impl WorkflowConfig {
    /// Parses a JSON document and validates the result.
    ///
    /// Missing fields fall back to defaults; unknown fields are rejected.
    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(value).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required_reviewer_roles.is_empty() {
            return Err(ConfigError::NoReviewerRoles);
        }
        let mut seen = HashSet::new();
        for tag in &self.required_reviewer_roles {
            if !seen.insert(tag) {
                return Err(ConfigError::DuplicateReviewerRole(tag.to_string()));
            }
        }
        if self.managing_roles.is_empty() {
            return Err(ConfigError::NoManagingRoles);
        }
        Ok(())
    }

    pub fn is_managing(&self, role: Role) -> bool {
        self.managing_roles.contains(&role)
    }

    pub fn is_resolving(&self, role: Role) -> bool {
        self.resolving_roles.contains(&role)
    }
}

/// Configuration parse/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    NoReviewerRoles,
    DuplicateReviewerRole(String),
    NoManagingRoles,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid workflow config: {message}"),
            Self::NoReviewerRoles => write!(f, "at least one reviewer role is required"),
            Self::DuplicateReviewerRole(tag) => {
                write!(f, "reviewer role listed more than once: {tag}")
            }
            Self::NoManagingRoles => write!(f, "at least one managing role is required"),
        }
    }
}

impl Error for ConfigError {}
