//! Typed response bodies for the template actions.
//!
//! Each action has a fixed top-level shape, so handlers return these
//! structs instead of ad-hoc `serde_json::json!` values.

use serde::Serialize;
use waba_db::models::wa_template::{TemplateStats, WaTemplate};
use waba_db::models::wa_template_event::WaTemplateEvent;

/// `{ "template": ... }` for create and update.
#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub template: WaTemplate,
}

/// Result of `list`: one page plus tenant-wide stats.
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<WaTemplate>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub stats: TemplateStats,
}

/// Result of `get`: the template and its most recent events, newest first.
#[derive(Debug, Serialize)]
pub struct TemplateDetailResponse {
    pub template: WaTemplate,
    pub events: Vec<WaTemplateEvent>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub meta_template_id: String,
    pub message: String,
    pub template: WaTemplate,
}

/// Counters from one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    /// Remote templates seen.
    pub synced: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: TemplateStats,
}

/// Result of a webhook delivery.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub applied: usize,
    pub skipped: usize,
}
