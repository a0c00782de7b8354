//! Reconciliation of local rows against Meta, the system of record for
//! approval state.
//!
//! [`sync_templates`] pulls the full remote list; [`apply_webhook`] applies
//! pushed change notifications. Both only ever move status, quality, and
//! category. Local content is never overwritten, and deleted rows are never
//! touched.

use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use waba_core::template_content::{TemplateCategory, DEFAULT_LANGUAGE};
use waba_core::template_events::{TemplateEventSource, TemplateEventType};
use waba_core::template_status::{TemplateStatus, TransitionSource};
use waba_core::template_validation::validate_name;
use waba_db::models::wa_template::{RemoteState, TemplateFields, WaTemplate};
use waba_db::models::wa_template_event::NewWaTemplateEvent;
use waba_db::repositories::{WaTemplateEventRepo, WaTemplateRepo};
use waba_meta::components::{fields_from_components, map_remote_quality, map_remote_status};
use waba_meta::gateway::TemplateGateway;
use waba_meta::types::RemoteTemplate;
use waba_meta::webhook::{TemplateChange, WebhookPayload};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{SyncResponse, WebhookResponse};

/// What one remote template did to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// Pull every remote template into the caller's tenant.
///
/// A failed fetch writes a single `sync_failed` event and changes nothing
/// else. The merge itself runs in one transaction.
pub async fn sync_templates(
    pool: &PgPool,
    gateway: &dyn TemplateGateway,
    actor: &AuthUser,
) -> AppResult<SyncResponse> {
    let correlation_id = Uuid::new_v4();

    let remote = match gateway.list_remote_templates().await {
        Ok(remote) => remote,
        Err(err) => {
            tracing::error!(tenant_id = actor.tenant_id, error = %err, %correlation_id, "Template sync fetch failed");
            WaTemplateEventRepo::insert(
                pool,
                &NewWaTemplateEvent::new(
                    actor.tenant_id,
                    TemplateEventType::SyncFailed,
                    TemplateEventSource::MetaSync,
                    correlation_id,
                )
                .actor(Some(actor.user_id))
                .metadata(json!({ "error": err.to_string(), "details": err.details() })),
            )
            .await?;
            return Err(AppError::Gateway(err));
        }
    };

    let mut result = SyncResponse {
        success: true,
        synced: remote.len(),
        ..Default::default()
    };

    let mut tx = pool.begin().await?;
    for item in &remote {
        match sync_one(&mut tx, actor, item, correlation_id).await? {
            SyncOutcome::Created => result.created += 1,
            SyncOutcome::Updated => result.updated += 1,
            SyncOutcome::Skipped => result.skipped += 1,
            SyncOutcome::Unchanged => {}
        }
    }
    tx.commit().await?;

    result.message = format!(
        "Synced {} templates from Meta: {} created, {} updated, {} skipped",
        result.synced, result.created, result.updated, result.skipped
    );
    tracing::info!(
        tenant_id = actor.tenant_id,
        synced = result.synced,
        created = result.created,
        updated = result.updated,
        skipped = result.skipped,
        %correlation_id,
        "Template sync complete",
    );
    Ok(result)
}

async fn sync_one(
    tx: &mut Transaction<'static, Postgres>,
    actor: &AuthUser,
    remote: &RemoteTemplate,
    correlation_id: Uuid,
) -> AppResult<SyncOutcome> {
    let status = map_remote_status(&remote.status);
    let quality = map_remote_quality(remote.quality_score());

    let existing = WaTemplateRepo::find_by_meta_id(&mut **tx, actor.tenant_id, &remote.id).await?;
    if let Some(local) = existing {
        if local.is_deleted() {
            return Ok(SyncOutcome::Skipped);
        }
        let old_status = local.parsed_status()?;
        let old_quality = local.parsed_quality()?;
        if !old_status.can_transition_to(status, TransitionSource::Remote) {
            tracing::info!(
                template_id = local.id,
                from = %old_status,
                to = %status,
                %correlation_id,
                "Leaving template untouched during sync",
            );
            return Ok(SyncOutcome::Skipped);
        }
        if old_status == status && old_quality == quality {
            return Ok(SyncOutcome::Unchanged);
        }

        let Some(updated) = WaTemplateRepo::apply_remote_status(
            &mut **tx,
            actor.tenant_id,
            local.id,
            status,
            Some(quality),
            remote.rejection_reason(),
        )
        .await?
        else {
            return Ok(SyncOutcome::Skipped);
        };
        WaTemplateEventRepo::insert(
            &mut **tx,
            &NewWaTemplateEvent::new(
                actor.tenant_id,
                TemplateEventType::Synced,
                TemplateEventSource::MetaSync,
                correlation_id,
            )
            .template(updated.id)
            .actor(Some(actor.user_id))
            .status_change(Some(old_status), status)
            .quality_change(Some(old_quality), quality)
            .metadata(json!({
                "meta_template_id": remote.id,
                "remote_status": remote.status,
                "rejection_reason": remote.rejection_reason(),
            })),
        )
        .await?;
        return Ok(SyncOutcome::Updated);
    }

    if let Some(reason) = import_blocker(tx, actor, remote, status).await? {
        tracing::warn!(
            tenant_id = actor.tenant_id,
            meta_template_id = %remote.id,
            name = %remote.name,
            reason,
            "Skipping remote template import",
        );
        return Ok(SyncOutcome::Skipped);
    }

    let fields = TemplateFields {
        name: remote.name.clone(),
        category: remote.category.parse().unwrap_or_default(),
        language: if remote.language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            remote.language.clone()
        },
        content: fields_from_components(&remote.components),
        components: serde_json::to_value(&remote.components)
            .map_err(|e| AppError::InternalError(format!("Failed to encode components: {e}")))?,
    };
    let state = RemoteState {
        meta_template_id: remote.id.clone(),
        status,
        quality,
        rejection_reason: remote.rejection_reason().map(str::to_string),
    };
    let imported = WaTemplateRepo::import_remote(&mut **tx, actor.tenant_id, &fields, &state).await?;
    WaTemplateEventRepo::insert(
        &mut **tx,
        &NewWaTemplateEvent::new(
            actor.tenant_id,
            TemplateEventType::Imported,
            TemplateEventSource::MetaSync,
            correlation_id,
        )
        .template(imported.id)
        .actor(Some(actor.user_id))
        .status_change(None, status)
        .quality_change(None, quality)
        .metadata(json!({
            "meta_template_id": remote.id,
            "remote_status": remote.status,
        })),
    )
    .await?;
    Ok(SyncOutcome::Created)
}

/// Why a remote template cannot be imported, if it cannot.
async fn import_blocker(
    tx: &mut Transaction<'static, Postgres>,
    actor: &AuthUser,
    remote: &RemoteTemplate,
    status: TemplateStatus,
) -> AppResult<Option<&'static str>> {
    if status == TemplateStatus::Deleted {
        return Ok(Some("deleted on Meta"));
    }
    if validate_name(&remote.name).is_err() {
        return Ok(Some("name does not match local naming rules"));
    }
    let clash = WaTemplateRepo::find_live_by_name(&mut **tx, actor.tenant_id, &remote.name).await?;
    if clash.is_some() {
        return Ok(Some("a live local template already uses this name"));
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// Apply every template change in one webhook delivery.
///
/// Templates are matched by remote id, then remote name; the owning tenant
/// comes from the matched row. Unknown and deleted templates are skipped.
pub async fn apply_webhook(pool: &PgPool, payload: &WebhookPayload) -> AppResult<WebhookResponse> {
    let correlation_id = Uuid::new_v4();
    let mut result = WebhookResponse {
        success: true,
        ..Default::default()
    };

    let mut tx = pool.begin().await?;
    for change in payload.template_changes() {
        let template_ref = change.template();
        let row = WaTemplateRepo::find_for_webhook(
            &mut *tx,
            template_ref.meta_template_id.as_deref(),
            template_ref.meta_template_name.as_deref(),
        )
        .await?;

        let Some(row) = row.filter(|row| !row.is_deleted()) else {
            tracing::warn!(
                meta_template_id = ?template_ref.meta_template_id,
                meta_template_name = ?template_ref.meta_template_name,
                %correlation_id,
                "Webhook change for unknown or deleted template, skipping",
            );
            result.skipped += 1;
            continue;
        };

        if apply_change(&mut tx, &row, &change, correlation_id).await? {
            result.applied += 1;
        } else {
            result.skipped += 1;
        }
    }
    tx.commit().await?;

    tracing::info!(applied = result.applied, skipped = result.skipped, %correlation_id, "Webhook processed");
    Ok(result)
}

/// Apply one change to a live row. Returns `false` when nothing changed.
async fn apply_change(
    tx: &mut Transaction<'static, Postgres>,
    row: &WaTemplate,
    change: &TemplateChange,
    correlation_id: Uuid,
) -> AppResult<bool> {
    let event = match change {
        TemplateChange::Status { event, reason, .. } => {
            let old_status = row.parsed_status()?;
            let new_status = map_remote_status(event);
            let reason = reason.as_deref().filter(|_| new_status == TemplateStatus::Rejected);
            if old_status == new_status && row.rejection_reason.as_deref() == reason {
                return Ok(false);
            }
            if !old_status.can_transition_to(new_status, TransitionSource::Remote) {
                tracing::warn!(template_id = row.id, from = %old_status, to = %new_status, "Ignoring impossible remote status change");
                return Ok(false);
            }
            let updated = WaTemplateRepo::apply_remote_status(
                &mut **tx,
                row.tenant_id,
                row.id,
                new_status,
                None,
                reason,
            )
            .await?;
            if updated.is_none() {
                return Ok(false);
            }
            new_event(row, TemplateEventType::StatusUpdate, correlation_id)
                .status_change(Some(old_status), new_status)
                .metadata(json!({ "remote_status": event, "reason": reason }))
        }
        TemplateChange::Quality {
            previous_score,
            new_score,
            reason,
            ..
        } => {
            let old_quality = row.parsed_quality()?;
            let new_quality = map_remote_quality(new_score.as_deref());
            let updated = WaTemplateRepo::apply_remote_quality(
                &mut **tx,
                row.tenant_id,
                row.id,
                new_quality,
                reason.as_deref(),
            )
            .await?;
            if updated.is_none() {
                return Ok(false);
            }
            new_event(row, TemplateEventType::QualityUpdate, correlation_id)
                .quality_change(Some(old_quality), new_quality)
                .metadata(json!({
                    "previous_score": previous_score,
                    "new_score": new_score,
                    "reason": reason,
                }))
        }
        TemplateChange::Category {
            previous_category,
            new_category,
            ..
        } => {
            let Some(category) = new_category
                .as_deref()
                .and_then(|c| c.parse::<TemplateCategory>().ok())
            else {
                tracing::warn!(template_id = row.id, new_category = ?new_category, "Unrecognised remote category, skipping");
                return Ok(false);
            };
            let updated =
                WaTemplateRepo::apply_remote_category(&mut **tx, row.tenant_id, row.id, category)
                    .await?;
            if updated.is_none() {
                return Ok(false);
            }
            new_event(row, TemplateEventType::CategoryUpdate, correlation_id).metadata(json!({
                "previous_category": previous_category,
                "new_category": category.as_str(),
            }))
        }
    };

    WaTemplateEventRepo::insert(&mut **tx, &event).await?;
    tracing::info!(
        template_id = row.id,
        tenant_id = row.tenant_id,
        event_type = event.event_type.as_str(),
        %correlation_id,
        "Applied webhook change",
    );
    Ok(true)
}

fn new_event(
    row: &WaTemplate,
    event_type: TemplateEventType,
    correlation_id: Uuid,
) -> NewWaTemplateEvent {
    NewWaTemplateEvent::new(
        row.tenant_id,
        event_type,
        TemplateEventSource::MetaWebhook,
        correlation_id,
    )
    .template(row.id)
}
