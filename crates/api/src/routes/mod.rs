pub mod health;
pub mod wa_templates;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /whatsapp-templates?action=...          template actions (JWT)
/// /whatsapp-templates/webhook             Meta webhook (signature)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(wa_templates::router())
}
