//! User and department directory contracts.
//!
//! # Responsibility
//! - Resolve users, department membership and functional-role holders for
//!   the workflow core.
//!
//! # Invariants
//! - The directory is read-only from the core's point of view.

mod in_memory;

pub use in_memory::InMemoryDirectory;

use crate::model::role::FunctionalRoleTag;
use crate::model::user::{DepartmentId, User, UserId};

/// Read-only view of the organization consumed by the stage machine.
pub trait DirectoryProvider {
    fn get_user(&self, id: UserId) -> Option<User>;
    /// Users whose home department is `department_id`, sorted by id.
    fn users_by_department(&self, department_id: DepartmentId) -> Vec<User>;
    /// Current holder of the functional position named by `tag`.
    fn functional_role_holder(&self, tag: &FunctionalRoleTag) -> Option<User>;
}

impl<T: DirectoryProvider + ?Sized> DirectoryProvider for &T {
    fn get_user(&self, id: UserId) -> Option<User> {
        (**self).get_user(id)
    }

    fn users_by_department(&self, department_id: DepartmentId) -> Vec<User> {
        (**self).users_by_department(department_id)
    }

    fn functional_role_holder(&self, tag: &FunctionalRoleTag) -> Option<User> {
        (**self).functional_role_holder(tag)
    }
}
