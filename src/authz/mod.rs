//! Authorization predicates for report access.
//!
//! Everything here is a pure function of already loaded users and reports:
//! - owners may read and mutate their own reports
//! - a user's direct supervisor may read, never mutate
//! - everybody else is denied, including peers and the supervisor's supervisor

mod evaluator;

pub use evaluator::{PermissionEvaluator, SupervisorPolicy};

use crate::models::{Role, User};

/// Exact role match, used to gate admin-only operations.
pub fn is_role(actor: &User, role: Role) -> bool {
    actor.role == role
}
