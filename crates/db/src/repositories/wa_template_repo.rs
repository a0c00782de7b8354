//! Repository for the `wa_templates` table.
//!
//! Every user-facing query is scoped by `tenant_id`. Functions that take a
//! generic executor run equally against the pool or inside a transaction.

use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use waba_core::template_content::TemplateCategory;
use waba_core::template_status::{TemplateQuality, TemplateStatus};
use waba_core::types::DbId;

use crate::models::wa_template::{
    RemoteState, TemplateFields, TemplateStats, WaTemplate, WaTemplateListParams,
};

/// Column list for `wa_templates` queries.
const COLUMNS: &str = "\
    id, tenant_id, created_by, name, category, language, header_type, \
    header_content, body_text, footer_text, buttons, components, status, \
    quality, quality_reason, rejection_reason, meta_template_id, \
    meta_template_name, version, is_locked, submitted_at, approved_at, \
    rejected_at, created_at, updated_at";

/// Statuses from which a template may be claimed for submission.
const SUBMITTABLE: &str = "('draft', 'rejected')";

/// Provides lifecycle operations for WhatsApp templates.
pub struct WaTemplateRepo;

impl WaTemplateRepo {
    // -----------------------------------------------------------------------
    // Inserts
    // -----------------------------------------------------------------------

    /// Insert a new draft template.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        created_by: DbId,
        fields: &TemplateFields,
    ) -> Result<WaTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO wa_templates \
                (tenant_id, created_by, name, category, language, header_type, \
                 header_content, body_text, footer_text, buttons, components) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(tenant_id)
            .bind(created_by)
            .bind(&fields.name)
            .bind(fields.category.as_str())
            .bind(&fields.language)
            .bind(fields.content.header_type.as_str())
            .bind(&fields.content.header_content)
            .bind(&fields.content.body_text)
            .bind(&fields.content.footer_text)
            .bind(Json(&fields.content.buttons))
            .bind(&fields.components)
            .fetch_one(executor)
            .await
    }

    /// Insert a template that exists only on the remote platform.
    ///
    /// The row has no creator and is locked when the remote status freezes
    /// its content.
    pub async fn import_remote<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        fields: &TemplateFields,
        remote: &RemoteState,
    ) -> Result<WaTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO wa_templates \
                (tenant_id, name, category, language, header_type, header_content, \
                 body_text, footer_text, buttons, components, status, quality, \
                 rejection_reason, meta_template_id, meta_template_name, is_locked, \
                 approved_at, rejected_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $2, $15, \
                 CASE WHEN $11 = 'approved' THEN now() END, \
                 CASE WHEN $11 = 'rejected' THEN now() END) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(tenant_id)
            .bind(&fields.name)
            .bind(fields.category.as_str())
            .bind(&fields.language)
            .bind(fields.content.header_type.as_str())
            .bind(&fields.content.header_content)
            .bind(&fields.content.body_text)
            .bind(&fields.content.footer_text)
            .bind(Json(&fields.content.buttons))
            .bind(&fields.components)
            .bind(remote.status.as_str())
            .bind(remote.quality.as_str())
            .bind(&remote.rejection_reason)
            .bind(&remote.meta_template_id)
            .bind(remote.status.locks_content())
            .fetch_one(executor)
            .await
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Find a template by ID within a tenant, including deleted rows.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM wa_templates WHERE id = $1 AND tenant_id = $2");
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await
    }

    /// Find a tenant's template by its remote ID.
    pub async fn find_by_meta_id<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        meta_template_id: &str,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wa_templates \
             WHERE tenant_id = $1 AND meta_template_id = $2"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(tenant_id)
            .bind(meta_template_id)
            .fetch_optional(executor)
            .await
    }

    /// Find a tenant's live (non-deleted) template by name.
    pub async fn find_live_by_name<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        name: &str,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wa_templates \
             WHERE tenant_id = $1 AND name = $2 AND status <> 'deleted'"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(tenant_id)
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    /// Resolve the template a webhook notification refers to.
    ///
    /// Not tenant-scoped: the owning tenant is taken from the matched row.
    /// A remote ID match wins over a name match, and live rows win over
    /// deleted ones.
    pub async fn find_for_webhook<'e, E: PgExecutor<'e>>(
        executor: E,
        meta_template_id: Option<&str>,
        meta_template_name: Option<&str>,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wa_templates \
             WHERE ($1::TEXT IS NOT NULL AND meta_template_id = $1) \
                OR ($2::TEXT IS NOT NULL AND meta_template_name = $2) \
             ORDER BY (meta_template_id IS NOT DISTINCT FROM $1) DESC, \
                      (status = 'deleted') ASC, \
                      updated_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(meta_template_id)
            .bind(meta_template_name)
            .fetch_optional(executor)
            .await
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// List a tenant's live templates, filtered, sorted, and paginated.
    pub async fn list_filtered(
        pool: &PgPool,
        tenant_id: DbId,
        params: &WaTemplateListParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WaTemplate>, sqlx::Error> {
        let (where_clause, param_idx) = filter_clause(params);
        let sort_by = params.sort_by.unwrap_or_default();
        let sort_order = params.sort_order.unwrap_or_default();

        let query = format!(
            "SELECT {COLUMNS} FROM wa_templates {where_clause} \
             ORDER BY {} {}, id {} \
             LIMIT ${param_idx} OFFSET ${}",
            sort_by.column(),
            sort_order.as_sql(),
            sort_order.as_sql(),
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, WaTemplate>(&query).bind(tenant_id);
        if let Some(status) = params.status {
            q = q.bind(status.as_str());
        }
        if let Some(category) = params.category {
            q = q.bind(category.as_str());
        }
        if let Some(language) = &params.language {
            q = q.bind(language);
        }
        if let Some(search) = &params.search {
            q = q.bind(like_pattern(search));
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }

    /// Count the rows [`list_filtered`](Self::list_filtered) would page over.
    pub async fn count_filtered(
        pool: &PgPool,
        tenant_id: DbId,
        params: &WaTemplateListParams,
    ) -> Result<i64, sqlx::Error> {
        let (where_clause, _) = filter_clause(params);
        let query = format!("SELECT COUNT(*) FROM wa_templates {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query).bind(tenant_id);
        if let Some(status) = params.status {
            q = q.bind(status.as_str());
        }
        if let Some(category) = params.category {
            q = q.bind(category.as_str());
        }
        if let Some(language) = &params.language {
            q = q.bind(language);
        }
        if let Some(search) = &params.search {
            q = q.bind(like_pattern(search));
        }

        q.fetch_one(pool).await
    }

    /// Status and quality counts over a tenant's live templates.
    pub async fn stats(pool: &PgPool, tenant_id: DbId) -> Result<TemplateStats, sqlx::Error> {
        let groups: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT status, quality, COUNT(*) FROM wa_templates \
             WHERE tenant_id = $1 AND status <> 'deleted' \
             GROUP BY status, quality",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;
        Ok(TemplateStats::from_groups(&groups))
    }

    // -----------------------------------------------------------------------
    // Local lifecycle
    // -----------------------------------------------------------------------

    /// Replace the content columns of an unlocked, live template and bump
    /// its version.
    ///
    /// Returns `None` when no row qualifies: missing, deleted, locked, or
    /// `expected_version` did not match.
    pub async fn update_content<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
        fields: &TemplateFields,
        expected_version: Option<i32>,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE wa_templates SET \
                name = $3, category = $4, language = $5, header_type = $6, \
                header_content = $7, body_text = $8, footer_text = $9, \
                buttons = $10, components = $11, version = version + 1 \
             WHERE id = $1 AND tenant_id = $2 \
               AND is_locked = false AND status <> 'deleted' \
               AND ($12::INTEGER IS NULL OR version = $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(&fields.name)
            .bind(fields.category.as_str())
            .bind(&fields.language)
            .bind(fields.content.header_type.as_str())
            .bind(&fields.content.header_content)
            .bind(&fields.content.body_text)
            .bind(&fields.content.footer_text)
            .bind(Json(&fields.content.buttons))
            .bind(&fields.components)
            .bind(expected_version)
            .fetch_optional(executor)
            .await
    }

    /// Claim a draft or rejected template for submission (`-> submitted`).
    ///
    /// The status guard makes this the arbiter between racing submits:
    /// only one caller gets the row back.
    pub async fn mark_submitted<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
        expected_version: Option<i32>,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE wa_templates SET status = 'submitted', submitted_at = now() \
             WHERE id = $1 AND tenant_id = $2 AND status IN {SUBMITTABLE} \
               AND ($3::INTEGER IS NULL OR version = $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(expected_version)
            .fetch_optional(executor)
            .await
    }

    /// Record remote acceptance (`submitted -> pending`) and lock the row.
    pub async fn confirm_submission<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
        meta_template_id: &str,
        meta_template_name: &str,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE wa_templates SET \
                status = 'pending', meta_template_id = $3, meta_template_name = $4, \
                is_locked = true, rejection_reason = NULL \
             WHERE id = $1 AND tenant_id = $2 AND status = 'submitted' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(meta_template_id)
            .bind(meta_template_name)
            .fetch_optional(executor)
            .await
    }

    /// Undo a claim after a failed registration (`submitted -> draft`).
    pub async fn revert_to_draft<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
        rejection_reason: &str,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE wa_templates SET status = 'draft', rejection_reason = $3 \
             WHERE id = $1 AND tenant_id = $2 AND status = 'submitted' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(rejection_reason)
            .fetch_optional(executor)
            .await
    }

    /// Soft-delete a live template. Returns `None` if already deleted or
    /// not found.
    pub async fn soft_delete<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE wa_templates SET status = 'deleted' \
             WHERE id = $1 AND tenant_id = $2 AND status <> 'deleted' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await
    }

    // -----------------------------------------------------------------------
    // Remote-driven updates (sync and webhook)
    // -----------------------------------------------------------------------

    /// Apply a remote status. The lock flag follows the status, and
    /// `quality` is left alone when `None`. Deleted rows are never touched.
    pub async fn apply_remote_status<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
        status: TemplateStatus,
        quality: Option<TemplateQuality>,
        rejection_reason: Option<&str>,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE wa_templates SET \
                status = $3, \
                quality = COALESCE($4, quality), \
                rejection_reason = $5, \
                is_locked = $6, \
                approved_at = CASE WHEN $3 = 'approved' THEN now() ELSE approved_at END, \
                rejected_at = CASE WHEN $3 = 'rejected' THEN now() ELSE rejected_at END \
             WHERE id = $1 AND tenant_id = $2 AND status NOT IN ('deleted', 'submitted') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(status.as_str())
            .bind(quality.map(TemplateQuality::as_str))
            .bind(rejection_reason)
            .bind(status.locks_content())
            .fetch_optional(executor)
            .await
    }

    /// Apply a remote quality rating and its reason.
    pub async fn apply_remote_quality<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
        quality: TemplateQuality,
        quality_reason: Option<&str>,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE wa_templates SET quality = $3, quality_reason = $4 \
             WHERE id = $1 AND tenant_id = $2 AND status <> 'deleted' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(quality.as_str())
            .bind(quality_reason)
            .fetch_optional(executor)
            .await
    }

    /// Apply a remote category reassignment.
    pub async fn apply_remote_category<'e, E: PgExecutor<'e>>(
        executor: E,
        tenant_id: DbId,
        id: DbId,
        category: TemplateCategory,
    ) -> Result<Option<WaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE wa_templates SET category = $3 \
             WHERE id = $1 AND tenant_id = $2 AND status <> 'deleted' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WaTemplate>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(category.as_str())
            .fetch_optional(executor)
            .await
    }
}

/// Build the `WHERE` clause for list queries. `$1` is always the tenant;
/// returns the clause and the next free parameter index.
fn filter_clause(params: &WaTemplateListParams) -> (String, usize) {
    let mut conditions = vec![
        "tenant_id = $1".to_string(),
        "status <> 'deleted'".to_string(),
    ];
    let mut param_idx: usize = 2;

    if params.status.is_some() {
        conditions.push(format!("status = ${param_idx}"));
        param_idx += 1;
    }
    if params.category.is_some() {
        conditions.push(format!("category = ${param_idx}"));
        param_idx += 1;
    }
    if params.language.is_some() {
        conditions.push(format!("language = ${param_idx}"));
        param_idx += 1;
    }
    if params.search.is_some() {
        conditions.push(format!("name ILIKE ${param_idx}"));
        param_idx += 1;
    }

    (format!("WHERE {}", conditions.join(" AND ")), param_idx)
}

/// Substring `ILIKE` pattern with the wildcard characters escaped, so
/// `order_` matches the literal underscore.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
