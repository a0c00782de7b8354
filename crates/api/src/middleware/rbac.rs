//! Role checks for template actions.
//!
//! Every action arrives on the same route, so roles are checked after the
//! action is parsed rather than by a route-level extractor.

use waba_core::error::CoreError;
use waba_core::roles::{can_delete_templates, can_edit_templates};

use super::auth::AuthUser;

/// Requires `admin`, `manager`, or `owner`. Rejects with 403 Forbidden otherwise.
pub fn require_editor(user: &AuthUser) -> Result<(), CoreError> {
    if !can_edit_templates(&user.role) {
        return Err(CoreError::Forbidden(
            "Admin, Manager or Owner role required".into(),
        ));
    }
    Ok(())
}

/// Requires `admin` or `owner`. Rejects with 403 Forbidden otherwise.
pub fn require_admin(user: &AuthUser) -> Result<(), CoreError> {
    if !can_delete_templates(&user.role) {
        return Err(CoreError::Forbidden("Admin or Owner role required".into()));
    }
    Ok(())
}
