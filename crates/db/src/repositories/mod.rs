//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async functions that
//! take an executor (`&PgPool` or a transaction) as the first argument.

pub mod wa_template_event_repo;
pub mod wa_template_repo;

pub use wa_template_event_repo::WaTemplateEventRepo;
pub use wa_template_repo::WaTemplateRepo;
