//! Request handlers.
//!
//! Handlers parse and authenticate the request, then delegate to the
//! lifecycle [`engine`](crate::engine). Errors map to HTTP via [`AppError`](crate::error::AppError).

pub mod wa_templates;
pub mod wa_webhook;
