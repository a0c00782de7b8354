use axum::routing::get;
use axum::Router;

use crate::handlers::{wa_templates, wa_webhook};
use crate::state::AppState;

/// Routes mounted under `/api/v1`.
///
/// ```text
/// GET, POST  /whatsapp-templates           dispatch on ?action=
/// GET        /whatsapp-templates/webhook   subscription handshake
/// POST       /whatsapp-templates/webhook   change notifications
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/whatsapp-templates",
            get(wa_templates::dispatch).post(wa_templates::dispatch),
        )
        .route(
            "/whatsapp-templates/webhook",
            get(wa_webhook::verify).post(wa_webhook::receive),
        )
}
