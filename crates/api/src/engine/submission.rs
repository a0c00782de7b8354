//! The submit saga.
//!
//! ```text
//! reserve    draft | rejected -> submitted     (event: submitted)
//! register   POST to Meta
//! confirm    submitted -> pending, locked      (event: meta_accepted)
//! compensate submitted -> draft                (event: submit_failed | submit_error)
//! ```
//!
//! The reservation is committed before the remote call, so a crash during
//! the round-trip leaves the row visibly `submitted` rather than silently in
//! draft. All events of one attempt share a correlation id.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use waba_core::error::CoreError;
use waba_core::template_events::{TemplateEventSource, TemplateEventType};
use waba_core::template_status::{validate_transition, TemplateStatus, TransitionSource};
use waba_core::types::DbId;
use waba_db::models::wa_template::WaTemplate;
use waba_db::models::wa_template_event::NewWaTemplateEvent;
use waba_db::repositories::{WaTemplateEventRepo, WaTemplateRepo};
use waba_meta::api::MetaApiError;
use waba_meta::components::build_components;
use waba_meta::gateway::TemplateGateway;
use waba_meta::types::{SubmitTemplateRequest, SubmitTemplateResponse};

use super::load_live;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_editor;

/// Rejection reason stored when Meta could not be reached.
pub const NETWORK_ERROR_REASON: &str = "Network error during submission";

/// A template accepted by Meta and now pending review.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub meta_template_id: String,
    pub template: WaTemplate,
}

/// Submit a draft or rejected template for review.
///
/// On a remote failure the template is reverted to draft before the
/// gateway error is returned, so callers never observe it in `submitted`.
pub async fn submit_template(
    pool: &PgPool,
    gateway: &dyn TemplateGateway,
    actor: &AuthUser,
    id: DbId,
    expected_version: Option<i32>,
) -> AppResult<SubmitOutcome> {
    require_editor(actor)?;
    let correlation_id = Uuid::new_v4();

    let (claimed, request) = reserve(pool, actor, id, expected_version, correlation_id).await?;

    match gateway.submit_template(&request).await {
        Ok(response) => confirm(pool, actor, &claimed, &response, correlation_id).await,
        Err(err) => {
            tracing::warn!(
                template_id = id,
                tenant_id = actor.tenant_id,
                error = %err,
                %correlation_id,
                "Meta rejected template submission",
            );
            compensate(
                pool,
                actor.tenant_id,
                Some(actor.user_id),
                claimed.id,
                &err,
                correlation_id,
            )
            .await?;
            Err(AppError::Gateway(err))
        }
    }
}

/// Claim the row (`-> submitted`), record the attempt, and build the
/// registration body from the claimed content. Nothing is committed when
/// the body cannot be built.
async fn reserve(
    pool: &PgPool,
    actor: &AuthUser,
    id: DbId,
    expected_version: Option<i32>,
    correlation_id: Uuid,
) -> AppResult<(WaTemplate, SubmitTemplateRequest)> {
    let current = load_live(pool, actor.tenant_id, id).await?;
    let status = current.parsed_status()?;
    if status == TemplateStatus::Submitted {
        return Err(CoreError::Conflict("Template submission is already in progress".into()).into());
    }
    validate_transition(status, TemplateStatus::Submitted, TransitionSource::Local)?;
    if let Some(expected) = expected_version {
        if expected != current.version {
            return Err(CoreError::Conflict(format!(
                "Template version mismatch: expected {expected}, current is {}",
                current.version
            ))
            .into());
        }
    }

    let mut tx = pool.begin().await?;
    let claimed = WaTemplateRepo::mark_submitted(&mut *tx, actor.tenant_id, id, expected_version)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Template was modified concurrently; reload and try again".into(),
            ))
        })?;
    let request = registration_request(&claimed)?;
    WaTemplateEventRepo::insert(
        &mut *tx,
        &NewWaTemplateEvent::new(
            actor.tenant_id,
            TemplateEventType::Submitted,
            TemplateEventSource::User,
            correlation_id,
        )
        .template(claimed.id)
        .actor(Some(actor.user_id))
        .status_change(Some(status), TemplateStatus::Submitted)
        .metadata(json!({ "version": claimed.version })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(template_id = id, tenant_id = actor.tenant_id, %correlation_id, "Template reserved for submission");
    Ok((claimed, request))
}

/// Build the Graph registration body from the stored row.
pub fn registration_request(template: &WaTemplate) -> AppResult<SubmitTemplateRequest> {
    let content = template.content()?;
    Ok(SubmitTemplateRequest {
        name: template.name.clone(),
        language: template.language.clone(),
        category: template.parsed_category()?.as_str().to_ascii_uppercase(),
        components: build_components(&content),
    })
}

/// Record Meta's acceptance (`submitted -> pending`) and lock the row.
async fn confirm(
    pool: &PgPool,
    actor: &AuthUser,
    claimed: &WaTemplate,
    response: &SubmitTemplateResponse,
    correlation_id: Uuid,
) -> AppResult<SubmitOutcome> {
    let mut tx = pool.begin().await?;
    let template = WaTemplateRepo::confirm_submission(
        &mut *tx,
        actor.tenant_id,
        claimed.id,
        &response.id,
        &claimed.name,
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!(
            "Template left 'submitted' while Meta was registering it (meta id {})",
            response.id
        )))
    })?;
    WaTemplateEventRepo::insert(
        &mut *tx,
        &NewWaTemplateEvent::new(
            actor.tenant_id,
            TemplateEventType::MetaAccepted,
            TemplateEventSource::MetaApi,
            correlation_id,
        )
        .template(template.id)
        .actor(Some(actor.user_id))
        .status_change(Some(TemplateStatus::Submitted), TemplateStatus::Pending)
        .metadata(json!({
            "meta_template_id": response.id,
            "meta_status": response.status,
            "meta_category": response.category,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        template_id = template.id,
        tenant_id = actor.tenant_id,
        meta_template_id = %response.id,
        %correlation_id,
        "Template accepted by Meta",
    );
    Ok(SubmitOutcome {
        meta_template_id: response.id.clone(),
        template,
    })
}

/// Undo a reservation after a failed registration (`submitted -> draft`).
///
/// The failure is stored as the rejection reason. Failures that never got
/// an answer from Meta (network errors, missing credentials) are logged as
/// `submit_error` from the system; remote rejections as `submit_failed`
/// from Meta. Returns `None` and writes nothing when the
/// row is no longer `submitted`.
pub async fn compensate(
    pool: &PgPool,
    tenant_id: DbId,
    actor_id: Option<DbId>,
    template_id: DbId,
    error: &MetaApiError,
    correlation_id: Uuid,
) -> AppResult<Option<WaTemplate>> {
    let (event_type, event_source, reason) = match error {
        err if err.is_transient() => (
            TemplateEventType::SubmitError,
            TemplateEventSource::System,
            NETWORK_ERROR_REASON.to_string(),
        ),
        MetaApiError::NotConfigured(_) => (
            TemplateEventType::SubmitError,
            TemplateEventSource::System,
            error.to_string(),
        ),
        MetaApiError::Api { message, .. } => (
            TemplateEventType::SubmitFailed,
            TemplateEventSource::MetaApi,
            message.clone(),
        ),
        other => (
            TemplateEventType::SubmitFailed,
            TemplateEventSource::MetaApi,
            other.to_string(),
        ),
    };

    let mut tx = pool.begin().await?;
    let Some(template) =
        WaTemplateRepo::revert_to_draft(&mut *tx, tenant_id, template_id, &reason).await?
    else {
        tracing::warn!(template_id, tenant_id, %correlation_id, "Nothing to compensate, template is not submitted");
        return Ok(None);
    };
    WaTemplateEventRepo::insert(
        &mut *tx,
        &NewWaTemplateEvent::new(tenant_id, event_type, event_source, correlation_id)
            .template(template.id)
            .actor(actor_id)
            .status_change(Some(TemplateStatus::Submitted), TemplateStatus::Draft)
            .metadata(json!({
                "error": error.to_string(),
                "details": error.details(),
            })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        template_id,
        tenant_id,
        event_type = event_type.as_str(),
        %correlation_id,
        "Submission compensated, template reverted to draft",
    );
    Ok(Some(template))
}
