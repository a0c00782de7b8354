//! Local template lifecycle: create, update, delete, and reads.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use waba_core::error::CoreError;
use waba_core::pagination::{clamp_limit, clamp_page, page_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use waba_core::template_content::{TemplateContent, DEFAULT_LANGUAGE};
use waba_core::template_events::{TemplateEventSource, TemplateEventType};
use waba_core::template_status::{validate_transition, TemplateStatus, TransitionSource};
use waba_core::template_validation::{validate_name, validate_placeholders, validate_required};
use waba_core::types::DbId;
use waba_db::models::wa_template::{
    CreateWaTemplate, TemplateStats, UpdateWaTemplate, WaTemplate, WaTemplateListParams,
};
use waba_db::models::wa_template_event::NewWaTemplateEvent;
use waba_db::repositories::wa_template_event_repo::RECENT_EVENT_LIMIT;
use waba_db::repositories::{WaTemplateEventRepo, WaTemplateRepo};
use waba_meta::gateway::TemplateGateway;

use super::{load_live, template_fields, TEMPLATE_ENTITY};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{require_admin, require_editor};
use crate::response::{TemplateDetailResponse, TemplateListResponse};

/// Run every content rule a template must pass before it is stored.
fn validate_content(name: &str, body_text: &str) -> Result<(), CoreError> {
    validate_required(name, body_text)?;
    validate_name(name)?;
    validate_placeholders(body_text)?;
    Ok(())
}

fn language_or_default(language: Option<String>) -> String {
    language
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Validate and insert a new draft template.
pub async fn create_template(
    pool: &PgPool,
    actor: &AuthUser,
    input: CreateWaTemplate,
) -> AppResult<WaTemplate> {
    require_editor(actor)?;
    validate_content(&input.name, &input.body_text)?;

    let fields = template_fields(
        input.name,
        input.category.unwrap_or_default(),
        language_or_default(input.language),
        TemplateContent {
            header_type: input.header_type.unwrap_or_default(),
            header_content: input.header_content,
            body_text: input.body_text,
            footer_text: input.footer_text,
            buttons: input.buttons.unwrap_or_default(),
        },
    )?;

    let correlation_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    let template = WaTemplateRepo::create(&mut *tx, actor.tenant_id, actor.user_id, &fields).await?;
    WaTemplateEventRepo::insert(
        &mut *tx,
        &NewWaTemplateEvent::new(
            actor.tenant_id,
            TemplateEventType::Created,
            TemplateEventSource::User,
            correlation_id,
        )
        .template(template.id)
        .actor(Some(actor.user_id))
        .status_change(None, TemplateStatus::Draft)
        .metadata(json!({ "name": template.name, "category": template.category })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        template_id = template.id,
        tenant_id = actor.tenant_id,
        user_id = actor.user_id,
        name = %template.name,
        %correlation_id,
        "Template created",
    );
    Ok(template)
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Apply a partial content edit to an unlocked template.
///
/// Absent fields keep their stored value; an explicit null clears a
/// nullable column. The version is bumped on every successful call.
pub async fn update_template(
    pool: &PgPool,
    actor: &AuthUser,
    input: UpdateWaTemplate,
) -> AppResult<WaTemplate> {
    require_editor(actor)?;

    let current = load_live(pool, actor.tenant_id, input.id).await?;
    if current.is_locked {
        return Err(CoreError::Locked(format!(
            "Template '{}' is {} and managed by Meta; it cannot be edited",
            current.name, current.status
        ))
        .into());
    }
    if let Some(expected) = input.expected_version {
        if expected != current.version {
            return Err(stale_version(expected, current.version));
        }
    }

    let old_content = current.content()?;
    let old_category = current.parsed_category()?;

    let name = input.name.unwrap_or_else(|| current.name.clone());
    let category = input.category.unwrap_or(old_category);
    let language = match input.language {
        Some(language) => language_or_default(Some(language)),
        None => current.language.clone(),
    };
    let content = TemplateContent {
        header_type: input.header_type.unwrap_or(old_content.header_type),
        header_content: input
            .header_content
            .unwrap_or_else(|| old_content.header_content.clone()),
        body_text: input.body_text.unwrap_or_else(|| old_content.body_text.clone()),
        footer_text: input
            .footer_text
            .unwrap_or_else(|| old_content.footer_text.clone()),
        buttons: input.buttons.unwrap_or_else(|| old_content.buttons.clone()),
    };
    validate_content(&name, &content.body_text)?;

    let mut changed_fields = Vec::new();
    if name != current.name {
        changed_fields.push("name");
    }
    if category != old_category {
        changed_fields.push("category");
    }
    if language != current.language {
        changed_fields.push("language");
    }
    if content.header_type != old_content.header_type {
        changed_fields.push("header_type");
    }
    if content.header_content != old_content.header_content {
        changed_fields.push("header_content");
    }
    if content.body_text != old_content.body_text {
        changed_fields.push("body_text");
    }
    if content.footer_text != old_content.footer_text {
        changed_fields.push("footer_text");
    }
    if content.buttons != old_content.buttons {
        changed_fields.push("buttons");
    }

    let fields = template_fields(name, category, language, content)?;
    let guard_version = input.expected_version.unwrap_or(current.version);

    let correlation_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    let template = WaTemplateRepo::update_content(
        &mut *tx,
        actor.tenant_id,
        current.id,
        &fields,
        Some(guard_version),
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "Template was modified concurrently; reload and try again".into(),
        ))
    })?;
    WaTemplateEventRepo::insert(
        &mut *tx,
        &NewWaTemplateEvent::new(
            actor.tenant_id,
            TemplateEventType::Updated,
            TemplateEventSource::User,
            correlation_id,
        )
        .template(template.id)
        .actor(Some(actor.user_id))
        .metadata(json!({
            "changed_fields": changed_fields,
            "version": template.version,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        template_id = template.id,
        tenant_id = actor.tenant_id,
        version = template.version,
        changed = ?changed_fields,
        %correlation_id,
        "Template updated",
    );
    Ok(template)
}

fn stale_version(expected: i32, actual: i32) -> AppError {
    AppError::Core(CoreError::Conflict(format!(
        "Template version mismatch: expected {expected}, current is {actual}"
    )))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Soft-delete a template, removing it from Meta first when it was
/// registered there. A remote failure is logged and does not block the
/// local delete.
pub async fn delete_template(
    pool: &PgPool,
    gateway: &dyn TemplateGateway,
    actor: &AuthUser,
    id: DbId,
) -> AppResult<WaTemplate> {
    require_admin(actor)?;

    let current = load_live(pool, actor.tenant_id, id).await?;
    let old_status = current.parsed_status()?;
    validate_transition(old_status, TemplateStatus::Deleted, TransitionSource::Local)?;

    let mut remote_deleted = false;
    if let Some(meta_name) = current.meta_template_name.as_deref() {
        match gateway.delete_remote_template(meta_name).await {
            Ok(()) => remote_deleted = true,
            Err(e) => tracing::warn!(
                template_id = id,
                meta_template_name = meta_name,
                error = %e,
                "Remote template delete failed, continuing with local delete",
            ),
        }
    }

    let correlation_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    let template = WaTemplateRepo::soft_delete(&mut *tx, actor.tenant_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: TEMPLATE_ENTITY,
            id,
        }))?;
    WaTemplateEventRepo::insert(
        &mut *tx,
        &NewWaTemplateEvent::new(
            actor.tenant_id,
            TemplateEventType::Deleted,
            TemplateEventSource::User,
            correlation_id,
        )
        .template(template.id)
        .actor(Some(actor.user_id))
        .status_change(Some(old_status), TemplateStatus::Deleted)
        .metadata(json!({
            "meta_template_name": current.meta_template_name,
            "remote_deleted": remote_deleted,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        template_id = id,
        tenant_id = actor.tenant_id,
        remote_deleted,
        %correlation_id,
        "Template deleted",
    );
    Ok(template)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// One template with its most recent events.
pub async fn get_template(
    pool: &PgPool,
    actor: &AuthUser,
    id: DbId,
) -> AppResult<TemplateDetailResponse> {
    let template = load_live(pool, actor.tenant_id, id).await?;
    let events =
        WaTemplateEventRepo::list_for_template(pool, actor.tenant_id, id, RECENT_EVENT_LIMIT)
            .await?;
    Ok(TemplateDetailResponse { template, events })
}

/// A filtered page of live templates plus tenant-wide stats.
pub async fn list_templates(
    pool: &PgPool,
    actor: &AuthUser,
    params: &WaTemplateListParams,
) -> AppResult<TemplateListResponse> {
    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = page_offset(page, limit);

    let templates =
        WaTemplateRepo::list_filtered(pool, actor.tenant_id, params, limit, offset).await?;
    let total = WaTemplateRepo::count_filtered(pool, actor.tenant_id, params).await?;
    let stats = WaTemplateRepo::stats(pool, actor.tenant_id).await?;

    Ok(TemplateListResponse {
        templates,
        total,
        page,
        limit,
        stats,
    })
}

pub async fn template_stats(pool: &PgPool, actor: &AuthUser) -> AppResult<TemplateStats> {
    Ok(WaTemplateRepo::stats(pool, actor.tenant_id).await?)
}
