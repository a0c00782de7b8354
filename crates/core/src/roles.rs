//! Well-known role name constants and the role sets used by the template
//! lifecycle.
//!
//! Roles are issued by the identity provider; this service only compares
//! them against the fixed sets below.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_OWNER: &str = "owner";
pub const ROLE_MANAGER: &str = "manager";

/// Role assumed when the identity token carries no role claim.
pub const ROLE_CUSTOMER: &str = "customer";

/// Roles allowed to create, edit, and submit templates.
pub const TEMPLATE_EDITOR_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_MANAGER, ROLE_OWNER];

/// Roles allowed to delete templates.
pub const TEMPLATE_ADMIN_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_OWNER];

/// Whether `role` may create, edit, or submit templates.
pub fn can_edit_templates(role: &str) -> bool {
    TEMPLATE_EDITOR_ROLES.contains(&role)
}

/// Whether `role` may delete templates.
pub fn can_delete_templates(role: &str) -> bool {
    TEMPLATE_ADMIN_ROLES.contains(&role)
}
