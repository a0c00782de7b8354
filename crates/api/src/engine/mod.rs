//! Template lifecycle engine.
//!
//! The only code that mutates `wa_templates` or appends to
//! `wa_template_events`. Every state change and its audit event are
//! committed in one transaction.
//!
//! - [`lifecycle`] -- create, update, delete, and the read-only queries.
//! - [`submission`] -- the submit saga (reserve, register, confirm or compensate).
//! - [`reconcile`] -- pulling remote truth in, via sync or webhook.

pub mod lifecycle;
pub mod reconcile;
pub mod submission;

use sqlx::PgExecutor;
use waba_core::error::CoreError;
use waba_core::template_content::{TemplateCategory, TemplateContent};
use waba_core::types::DbId;
use waba_db::models::wa_template::{TemplateFields, WaTemplate};
use waba_db::repositories::WaTemplateRepo;
use waba_meta::components::build_components;

use crate::error::{AppError, AppResult};

/// Entity name used in `NotFound` errors.
pub const TEMPLATE_ENTITY: &str = "WhatsApp template";

/// Load a live (non-deleted) template of `tenant_id`.
pub(crate) async fn load_live<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant_id: DbId,
    id: DbId,
) -> AppResult<WaTemplate> {
    WaTemplateRepo::find_by_id(executor, tenant_id, id)
        .await?
        .filter(|template| !template.is_deleted())
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: TEMPLATE_ENTITY,
            id,
        }))
}

/// Assemble the stored columns for `content`, deriving the component list.
pub(crate) fn template_fields(
    name: String,
    category: TemplateCategory,
    language: String,
    content: TemplateContent,
) -> AppResult<TemplateFields> {
    let components = serde_json::to_value(build_components(&content))
        .map_err(|e| AppError::InternalError(format!("Failed to encode components: {e}")))?;
    Ok(TemplateFields {
        name,
        category,
        language,
        content,
        components,
    })
}
