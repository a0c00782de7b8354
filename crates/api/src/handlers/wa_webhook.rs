//! Handlers for `/whatsapp-templates/webhook`.
//!
//! Carries no JWT. The `GET` handshake is authenticated by the shared verify
//! token and `POST` deliveries by the `X-Hub-Signature-256` body signature.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use waba_core::error::CoreError;
use waba_meta::webhook::{verify_signature, SubscriptionQuery, WebhookPayload, SIGNATURE_HEADER};

use crate::engine::reconcile;
use crate::error::{AppError, AppResult};
use crate::response::WebhookResponse;
use crate::state::AppState;

/// GET /api/v1/whatsapp-templates/webhook
///
/// Echoes `hub.challenge` for a valid subscription request, 403 otherwise.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<SubscriptionQuery>,
) -> Response {
    match query.accept(state.config.meta.verify_token.as_deref()) {
        Some(challenge) => {
            tracing::info!("Webhook subscription verified");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        None => {
            tracing::warn!(mode = ?query.mode, "Webhook verification failed");
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}

/// POST /api/v1/whatsapp-templates/webhook
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookResponse>> {
    match state.config.meta.app_secret.as_deref() {
        Some(secret) => {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok());
            verify_signature(secret, &body, signature).map_err(|e| {
                tracing::warn!(error = %e, "Rejected webhook with bad signature");
                AppError::Core(CoreError::Unauthorized(e.to_string()))
            })?;
        }
        None => {
            tracing::warn!("FACEBOOK_APP_SECRET is not set; accepting unsigned webhook");
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON payload: {e}")))?;

    let result = reconcile::apply_webhook(&state.pool, &payload).await?;
    Ok(Json(result))
}
