//! In-process directory backed by ordered maps.

use super::DirectoryProvider;
use crate::model::role::FunctionalRoleTag;
use crate::model::user::{Department, DepartmentId, User, UserId};
use std::collections::BTreeMap;

/// Directory snapshot held in memory, used by tests, probes and hosts that
/// preload the organization.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: BTreeMap<UserId, User>,
    departments: BTreeMap<DepartmentId, Department>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one department.
    pub fn add_department(&mut self, department: Department) -> &mut Self {
        self.departments.insert(department.id, department);
        self
    }

    /// Inserts or replaces one user.
    pub fn add_user(&mut self, user: User) -> &mut Self {
        self.users.insert(user.id, user);
        self
    }
}

impl DirectoryProvider for InMemoryDirectory {
    fn get_user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).cloned()
    }

    fn users_by_department(&self, department_id: DepartmentId) -> Vec<User> {
        self.users
            .values()
            .filter(|user| user.department_id == Some(department_id))
            .cloned()
            .collect()
    }

    fn functional_role_holder(&self, tag: &FunctionalRoleTag) -> Option<User> {
        let head_id = self
            .departments
            .values()
            .find(|department| department.functional_role.as_ref() == Some(tag))?
            .head_user_id?;
        self.get_user(head_id)
    }
}
