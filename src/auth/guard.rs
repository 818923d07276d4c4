//! Role-based authorization guard
//!
//! Gates built on top of the resolved user. Roles are an exact-match set:
//! there is no hierarchy and no implied privileges.

use crate::error::AuthError;
use crate::models::{CurrentUser, UserRole};

/// Require the user to hold exactly the given role
pub fn require_role(user: &CurrentUser, required: UserRole) -> Result<(), AuthError> {
    if user.role != required {
        return Err(AuthError::RoleRequired(required));
    }
    Ok(())
}

/// Require the admin role
pub fn require_admin(user: &CurrentUser) -> Result<(), AuthError> {
    require_role(user, UserRole::Admin)
}
