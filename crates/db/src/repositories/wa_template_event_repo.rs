//! Repository for the append-only `wa_template_events` table.

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;
use waba_core::types::DbId;

use crate::models::wa_template_event::{NewWaTemplateEvent, WaTemplateEvent};

/// Column list for `wa_template_events` queries.
const COLUMNS: &str = "\
    id, template_id, tenant_id, actor_id, event_type, event_source, \
    old_status, new_status, old_quality, new_quality, metadata, \
    correlation_id, created_at";

/// Number of events returned alongside a single template.
pub const RECENT_EVENT_LIMIT: i64 = 50;

/// Appends and reads template audit events. There is no update or delete.
pub struct WaTemplateEventRepo;

impl WaTemplateEventRepo {
    /// Append one event.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        event: &NewWaTemplateEvent,
    ) -> Result<WaTemplateEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO wa_template_events \
                (template_id, tenant_id, actor_id, event_type, event_source, \
                 old_status, new_status, old_quality, new_quality, metadata, correlation_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplateEvent>(&query)
            .bind(event.template_id)
            .bind(event.tenant_id)
            .bind(event.actor_id)
            .bind(event.event_type.as_str())
            .bind(event.event_source.as_str())
            .bind(event.old_status.map(|s| s.as_str()))
            .bind(event.new_status.map(|s| s.as_str()))
            .bind(event.old_quality.map(|q| q.as_str()))
            .bind(event.new_quality.map(|q| q.as_str()))
            .bind(&event.metadata)
            .bind(event.correlation_id)
            .fetch_one(executor)
            .await
    }

    /// Most recent events for a template, newest first.
    pub async fn list_for_template(
        pool: &PgPool,
        tenant_id: DbId,
        template_id: DbId,
        limit: i64,
    ) -> Result<Vec<WaTemplateEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wa_template_events \
             WHERE tenant_id = $1 AND template_id = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, WaTemplateEvent>(&query)
            .bind(tenant_id)
            .bind(template_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// All events written by one logical operation, oldest first.
    pub async fn list_by_correlation(
        pool: &PgPool,
        tenant_id: DbId,
        correlation_id: Uuid,
    ) -> Result<Vec<WaTemplateEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wa_template_events \
             WHERE tenant_id = $1 AND correlation_id = $2 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, WaTemplateEvent>(&query)
            .bind(tenant_id)
            .bind(correlation_id)
            .fetch_all(pool)
            .await
    }

    /// Total events recorded for a tenant.
    pub async fn count_for_tenant(pool: &PgPool, tenant_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM wa_template_events WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(pool)
            .await
    }
}
