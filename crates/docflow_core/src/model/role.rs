//! Organizational roles and functional-role tags.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static FUNCTIONAL_ROLE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.-]*$").expect("valid functional role tag regex"));

/// Role held by a user in the bank's organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    /// Management board.
    Boshqaruv,
    /// Bank apparatus (registry and dispatch office).
    BankApparati,
    /// Department head.
    Tarmoq,
    /// Rank-and-file employee.
    Xodim,
}

impl Role {
    /// Stable string id used in directory data and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Boshqaruv => ROLE_BOSHQARUV,
            Self::BankApparati => ROLE_BANK_APPARATI,
            Self::Tarmoq => ROLE_TARMOQ,
            Self::Xodim => ROLE_XODIM,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_BOSHQARUV: &str = "Boshqaruv";
pub const ROLE_BANK_APPARATI: &str = "BankApparati";
pub const ROLE_TARMOQ: &str = "Tarmoq";
pub const ROLE_XODIM: &str = "Xodim";

/// Parses one role from its stable string id.
pub fn parse_role(value: &str) -> Result<Role, RoleError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(RoleError::EmptyRole);
    }

    match normalized {
        ROLE_ADMIN => Ok(Role::Admin),
        ROLE_BOSHQARUV => Ok(Role::Boshqaruv),
        ROLE_BANK_APPARATI => Ok(Role::BankApparati),
        ROLE_TARMOQ => Ok(Role::Tarmoq),
        ROLE_XODIM => Ok(Role::Xodim),
        other => Err(RoleError::UnsupportedRole(other.to_string())),
    }
}

/// Role parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    EmptyRole,
    UnsupportedRole(String),
    InvalidFunctionalRoleTag(String),
}

impl Display for RoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRole => write!(f, "role value must not be empty"),
            Self::UnsupportedRole(value) => write!(f, "role is unsupported: {value}"),
            Self::InvalidFunctionalRoleTag(value) => {
                write!(f, "functional role tag is invalid: `{value}`")
            }
        }
    }
}

impl Error for RoleError {}

/// Tag naming a functional position (legal, compliance, ...) whose holder is
/// resolved through the directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionalRoleTag(String);

impl FunctionalRoleTag {
    pub fn new(value: impl Into<String>) -> Result<Self, RoleError> {
        let value = value.into();
        if !FUNCTIONAL_ROLE_TAG_RE.is_match(&value) {
            return Err(RoleError::InvalidFunctionalRoleTag(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FunctionalRoleTag {
    type Error = RoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FunctionalRoleTag> for String {
    fn from(value: FunctionalRoleTag) -> Self {
        value.0
    }
}

impl Display for FunctionalRoleTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
