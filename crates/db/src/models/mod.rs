//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the `Deserialize` input DTOs that feed it.

pub mod wa_template;
pub mod wa_template_event;
