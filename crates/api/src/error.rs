use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use waba_core::error::CoreError;
use waba_meta::api::MetaApiError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`MetaApiError`] for remote
/// failures, and adds HTTP-specific variants. Implements [`IntoResponse`] to
/// produce consistent JSON error responses of the shape
/// `{error, code, details?, retry?}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `waba_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A failed call to the remote template API.
    #[error(transparent)]
    Gateway(#[from] MetaApiError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Locked(msg) => (StatusCode::FORBIDDEN, "LOCKED", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Remote API errors ---
            AppError::Gateway(err) => classify_gateway_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let AppError::Gateway(err) = &self {
            if let Some(details) = err.details() {
                body["details"] = details.clone();
            }
            if err.is_transient() {
                body["retry"] = json!(true);
            }
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Classify a remote API failure.
///
/// - A remote rejection maps to 400 with the remote message.
/// - A network failure maps to 500; the body tells the caller to retry.
/// - A malformed remote response maps to 502.
/// - Missing credentials map to 500.
fn classify_gateway_error(err: &MetaApiError) -> (StatusCode, &'static str, String) {
    match err {
        MetaApiError::Api { message, .. } => {
            (StatusCode::BAD_REQUEST, "GATEWAY_ERROR", message.clone())
        }
        MetaApiError::Transport(msg) => {
            tracing::warn!(error = %msg, "Meta API unreachable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "GATEWAY_UNAVAILABLE",
                "Failed to connect to Meta API".to_string(),
            )
        }
        MetaApiError::Decode(msg) => {
            tracing::error!(error = %msg, "Unexpected Meta API response");
            (
                StatusCode::BAD_GATEWAY,
                "GATEWAY_BAD_RESPONSE",
                "Unexpected response from Meta API".to_string(),
            )
        }
        MetaApiError::NotConfigured(var) => {
            tracing::error!(missing = var, "Meta API is not configured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NOT_CONFIGURED",
                format!("Meta API is not configured: {var} is missing"),
            )
        }
    }
}
