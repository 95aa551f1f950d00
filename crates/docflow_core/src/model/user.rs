//! Directory records referenced (never owned) by correspondence documents.

use crate::model::role::{FunctionalRoleTag, Role};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type DepartmentId = i64;

/// A person known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub role: Role,
    /// `None` for users outside the department hierarchy (board, admins).
    pub department_id: Option<DepartmentId>,
}

/// Node of the department hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub parent_id: Option<DepartmentId>,
    pub head_user_id: Option<UserId>,
    /// Functional position this department's head occupies, if any.
    pub functional_role: Option<FunctionalRoleTag>,
}

/// Identity and role of the user requesting a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

impl From<&User> for Actor {
    fn from(value: &User) -> Self {
        Self {
            id: value.id,
            role: value.role,
        }
    }
}
