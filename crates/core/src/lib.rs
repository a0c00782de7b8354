//! Domain types and pure rules for the WhatsApp template lifecycle.
//!
//! Nothing in this crate performs I/O; the database and remote gateway
//! layers build on these types.

pub mod error;
pub mod pagination;
pub mod roles;
pub mod template_content;
pub mod template_events;
pub mod template_status;
pub mod template_validation;
pub mod types;
