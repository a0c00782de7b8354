//! WhatsApp template entity model and DTOs.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use waba_core::error::CoreError;
use waba_core::template_content::{
    buttons_from_json, HeaderKind, TemplateButton, TemplateCategory, TemplateContent,
};
use waba_core::template_status::{TemplateQuality, TemplateStatus};
use waba_core::types::{DbId, Timestamp};

/// A row from the `wa_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WaTemplate {
    pub id: DbId,
    pub tenant_id: DbId,
    pub created_by: Option<DbId>,
    pub name: String,
    pub category: String,
    pub language: String,
    pub header_type: String,
    pub header_content: Option<String>,
    pub body_text: String,
    pub footer_text: Option<String>,
    pub buttons: serde_json::Value,
    pub components: serde_json::Value,
    pub status: String,
    pub quality: String,
    pub quality_reason: Option<String>,
    pub rejection_reason: Option<String>,
    pub meta_template_id: Option<String>,
    pub meta_template_name: Option<String>,
    pub version: i32,
    pub is_locked: bool,
    pub submitted_at: Option<Timestamp>,
    pub approved_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WaTemplate {
    pub fn parsed_status(&self) -> Result<TemplateStatus, CoreError> {
        self.status.parse()
    }

    pub fn parsed_quality(&self) -> Result<TemplateQuality, CoreError> {
        self.quality.parse()
    }

    pub fn parsed_category(&self) -> Result<TemplateCategory, CoreError> {
        self.category.parse()
    }

    pub fn is_deleted(&self) -> bool {
        self.status == TemplateStatus::Deleted.as_str()
    }

    /// Decode the stored content columns.
    pub fn content(&self) -> Result<TemplateContent, CoreError> {
        Ok(TemplateContent {
            header_type: self.header_type.parse::<HeaderKind>()?,
            header_content: self.header_content.clone(),
            body_text: self.body_text.clone(),
            footer_text: self.footer_text.clone(),
            buttons: buttons_from_json(&self.buttons)?,
        })
    }
}

/// Request body for the `create` action.
///
/// `name` and `body_text` default to empty so a missing field reports as
/// a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateWaTemplate {
    #[serde(default)]
    pub name: String,
    pub category: Option<TemplateCategory>,
    pub language: Option<String>,
    pub header_type: Option<HeaderKind>,
    pub header_content: Option<String>,
    #[serde(default)]
    pub body_text: String,
    pub footer_text: Option<String>,
    pub buttons: Option<Vec<TemplateButton>>,
}

/// Request body for the `update` action. Absent fields keep their value.
///
/// The nullable columns use `Option<Option<String>>`: an absent key is
/// `None`, an explicit `null` is `Some(None)` and clears the column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWaTemplate {
    pub id: DbId,
    pub name: Option<String>,
    pub category: Option<TemplateCategory>,
    pub language: Option<String>,
    pub header_type: Option<HeaderKind>,
    #[serde(default, deserialize_with = "nullable")]
    pub header_content: Option<Option<String>>,
    pub body_text: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub footer_text: Option<Option<String>>,
    pub buttons: Option<Vec<TemplateButton>>,
    pub expected_version: Option<i32>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Fully resolved content columns for an insert or a content update.
#[derive(Debug, Clone)]
pub struct TemplateFields {
    pub name: String,
    pub category: TemplateCategory,
    pub language: String,
    pub content: TemplateContent,
    pub components: serde_json::Value,
}

/// Remote-reported state carried by an imported template.
#[derive(Debug, Clone)]
pub struct RemoteState {
    pub meta_template_id: String,
    pub status: TemplateStatus,
    pub quality: TemplateQuality,
    pub rejection_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Sortable columns. The variant picks the SQL column, so user input never
/// reaches the `ORDER BY` clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSortField {
    CreatedAt,
    #[default]
    UpdatedAt,
    Name,
    Status,
    Category,
}

impl TemplateSortField {
    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
            Self::Status => "status",
            Self::Category => "category",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query parameters for the `list` action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaTemplateListParams {
    pub status: Option<TemplateStatus>,
    pub category: Option<TemplateCategory>,
    pub language: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<TemplateSortField>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<SortOrder>,
}

/// Per-status and per-quality counts for a tenant's live templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateStats {
    pub total: i64,
    pub draft: i64,
    pub submitted: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub paused: i64,
    pub disabled: i64,
    pub quality_high: i64,
    pub quality_medium: i64,
    pub quality_low: i64,
}

impl TemplateStats {
    /// Fold `(status, quality, count)` groups into totals. Deleted rows are
    /// expected to be filtered out by the caller's query.
    pub fn from_groups(groups: &[(String, String, i64)]) -> Self {
        let mut stats = Self::default();
        for (status, quality, count) in groups {
            let count = *count;
            stats.total += count;
            match status.as_str() {
                "draft" => stats.draft += count,
                "submitted" => stats.submitted += count,
                "pending" => stats.pending += count,
                "approved" => stats.approved += count,
                "rejected" => stats.rejected += count,
                "paused" => stats.paused += count,
                "disabled" => stats.disabled += count,
                _ => {}
            }
            match quality.as_str() {
                "high" => stats.quality_high += count,
                "medium" => stats.quality_medium += count,
                "low" => stats.quality_low += count,
                _ => {}
            }
        }
        stats
    }
}
