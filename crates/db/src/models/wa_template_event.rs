//! Template audit event model.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use waba_core::template_events::{TemplateEventSource, TemplateEventType};
use waba_core::template_status::{TemplateQuality, TemplateStatus};
use waba_core::types::{DbId, Timestamp};

/// A row from the `wa_template_events` table. Rows are append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WaTemplateEvent {
    pub id: DbId,
    pub template_id: Option<DbId>,
    pub tenant_id: DbId,
    pub actor_id: Option<DbId>,
    pub event_type: String,
    pub event_source: String,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub old_quality: Option<String>,
    pub new_quality: Option<String>,
    pub metadata: serde_json::Value,
    pub correlation_id: Uuid,
    pub created_at: Timestamp,
}

/// An event about to be appended.
///
/// ```ignore
/// NewWaTemplateEvent::new(tenant_id, TemplateEventType::Submitted, TemplateEventSource::User, cid)
///     .template(template.id)
///     .actor(user_id)
///     .status_change(Some(TemplateStatus::Draft), TemplateStatus::Submitted)
/// ```
#[derive(Debug, Clone)]
pub struct NewWaTemplateEvent {
    pub template_id: Option<DbId>,
    pub tenant_id: DbId,
    pub actor_id: Option<DbId>,
    pub event_type: TemplateEventType,
    pub event_source: TemplateEventSource,
    pub old_status: Option<TemplateStatus>,
    pub new_status: Option<TemplateStatus>,
    pub old_quality: Option<TemplateQuality>,
    pub new_quality: Option<TemplateQuality>,
    pub metadata: serde_json::Value,
    pub correlation_id: Uuid,
}

impl NewWaTemplateEvent {
    pub fn new(
        tenant_id: DbId,
        event_type: TemplateEventType,
        event_source: TemplateEventSource,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            template_id: None,
            tenant_id,
            actor_id: None,
            event_type,
            event_source,
            old_status: None,
            new_status: None,
            old_quality: None,
            new_quality: None,
            metadata: serde_json::json!({}),
            correlation_id,
        }
    }

    pub fn template(mut self, template_id: DbId) -> Self {
        self.template_id = Some(template_id);
        self
    }

    pub fn actor(mut self, actor_id: Option<DbId>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn status_change(mut self, old: Option<TemplateStatus>, new: TemplateStatus) -> Self {
        self.old_status = old;
        self.new_status = Some(new);
        self
    }

    pub fn quality_change(mut self, old: Option<TemplateQuality>, new: TemplateQuality) -> Self {
        self.old_quality = old;
        self.new_quality = Some(new);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
