//! Authentication and authorization.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::require_editor`] -- Requires a template editor role.
//! - [`rbac::require_admin`] -- Requires a template admin role.

pub mod auth;
pub mod rbac;
