//! Engine-level integration tests for the template lifecycle: create,
//! update, submit saga, sync, and delete against a real database and an
//! in-memory gateway.

mod common;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::{actor, remote_rejection, remote_template, FakeGateway};
use sqlx::PgPool;
use uuid::Uuid;
use waba_api::engine::submission::{compensate, NETWORK_ERROR_REASON};
use waba_api::engine::{lifecycle, reconcile, submission};
use waba_api::error::AppError;
use waba_api::middleware::auth::AuthUser;
use waba_core::error::CoreError;
use waba_db::models::wa_template::{
    CreateWaTemplate, UpdateWaTemplate, WaTemplate, WaTemplateListParams,
};
use waba_db::models::wa_template_event::WaTemplateEvent;
use waba_db::repositories::{WaTemplateEventRepo, WaTemplateRepo};
use waba_meta::api::MetaApiError;
use waba_meta::gateway::TemplateGateway;
use waba_meta::types::{RemoteTemplate, SubmitTemplateRequest, SubmitTemplateResponse};

const TENANT: i64 = 10;
const OTHER_TENANT: i64 = 20;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn input(name: &str, body_text: &str) -> CreateWaTemplate {
    CreateWaTemplate {
        name: name.to_string(),
        body_text: body_text.to_string(),
        ..Default::default()
    }
}

async fn create(pool: &PgPool, name: &str) -> WaTemplate {
    lifecycle::create_template(pool, &actor(1, TENANT, "manager"), input(name, "Hello {{1}}"))
        .await
        .expect("create should succeed")
}

async fn reload(pool: &PgPool, id: i64) -> WaTemplate {
    WaTemplateRepo::find_by_id(pool, TENANT, id)
        .await
        .unwrap()
        .expect("template should exist")
}

async fn events(pool: &PgPool, id: i64) -> Vec<WaTemplateEvent> {
    // Newest first.
    WaTemplateEventRepo::list_for_template(pool, TENANT, id, 50)
        .await
        .unwrap()
}

async fn event_count(pool: &PgPool) -> i64 {
    WaTemplateEventRepo::count_for_tenant(pool, TENANT).await.unwrap()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_applies_defaults_and_logs_created(pool: PgPool) {
    let template = create(&pool, "order_update_v2").await;

    assert_eq!(template.status, "draft");
    assert_eq!(template.version, 1);
    assert_eq!(template.language, "ar");
    assert_eq!(template.category, "utility");
    assert_eq!(template.header_type, "none");
    assert_eq!(template.buttons, serde_json::json!([]));
    assert_eq!(
        template.components,
        serde_json::json!([{ "type": "BODY", "text": "Hello {{1}}" }])
    );
    assert!(!template.is_locked);

    let events = events(&pool, template.id).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "created");
    assert_eq!(events[0].event_source, "user");
    assert_eq!(events[0].actor_id, Some(1));
    assert_eq!(events[0].new_status.as_deref(), Some("draft"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_name_is_rejected_without_insert(pool: PgPool) {
    let manager = actor(1, TENANT, "manager");
    for name in ["My-Template", "1st_template", "order update", "Order"] {
        let result = lifecycle::create_template(&pool, &manager, input(name, "Hi")).await;
        assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))), "{name}");
    }

    let page = lifecycle::list_templates(&pool, &manager, &WaTemplateListParams::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(event_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_placeholders_must_be_sequential(pool: PgPool) {
    let manager = actor(1, TENANT, "manager");

    let gap = lifecycle::create_template(
        &pool,
        &manager,
        input("order_ready", "Hello {{1}}, your order {{3}} is ready"),
    )
    .await;
    assert_matches!(gap, Err(AppError::Core(CoreError::Validation(_))));

    let ok = lifecycle::create_template(
        &pool,
        &manager,
        input("order_ready", "Hello {{1}}, order {{2}} ready"),
    )
    .await;
    assert!(ok.is_ok());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_requires_name_and_body(pool: PgPool) {
    let result =
        lifecycle::create_template(&pool, &actor(1, TENANT, "admin"), input("welcome", "")).await;
    assert_matches!(result, Err(AppError::Core(CoreError::Validation(msg))) if msg.contains("required"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_requires_editor_role(pool: PgPool) {
    let result = lifecycle::create_template(
        &pool,
        &actor(1, TENANT, "customer"),
        input("welcome", "Hi"),
    )
    .await;
    assert_matches!(result, Err(AppError::Core(CoreError::Forbidden(_))));
    assert_eq!(event_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_live_name_is_a_unique_violation(pool: PgPool) {
    create(&pool, "welcome").await;
    let result = lifecycle::create_template(
        &pool,
        &actor(1, TENANT, "manager"),
        input("welcome", "Hi again"),
    )
    .await;
    assert_matches!(
        result,
        Err(AppError::Database(sqlx::Error::Database(e)))
            if e.constraint() == Some("uq_wa_templates_tenant_name")
    );
    // The failed insert rolled back its event too.
    assert_eq!(event_count(&pool).await, 1);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_every_update_bumps_version_by_one(pool: PgPool) {
    let template = create(&pool, "welcome").await;
    let manager = actor(1, TENANT, "manager");

    let mut version = template.version;
    for body in ["Hi {{1}}", "Hey {{1}} and {{2}}", "Hey {{1}} and {{2}}"] {
        let updated = lifecycle::update_template(
            &pool,
            &manager,
            UpdateWaTemplate {
                id: template.id,
                body_text: Some(body.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.version, version + 1);
        version = updated.version;
    }

    let latest = &events(&pool, template.id).await[0];
    assert_eq!(latest.event_type, "updated");
    // The last update repeated the previous body.
    assert_eq!(latest.metadata["changed_fields"], serde_json::json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_rebuilds_components_and_reports_changed_fields(pool: PgPool) {
    let template = create(&pool, "welcome").await;

    let updated = lifecycle::update_template(
        &pool,
        &actor(1, TENANT, "owner"),
        UpdateWaTemplate {
            id: template.id,
            body_text: Some("Welcome {{1}}".into()),
            footer_text: Some(Some("Reply STOP to opt out".into())),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(
        updated.components,
        serde_json::json!([
            { "type": "BODY", "text": "Welcome {{1}}" },
            { "type": "FOOTER", "text": "Reply STOP to opt out" }
        ])
    );
    let latest = &events(&pool, template.id).await[0];
    assert_eq!(
        latest.metadata["changed_fields"],
        serde_json::json!(["body_text", "footer_text"])
    );
    assert_eq!(latest.metadata["version"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_with_null_clears_footer(pool: PgPool) {
    let template = create(&pool, "welcome").await;
    let manager = actor(1, TENANT, "manager");

    lifecycle::update_template(
        &pool,
        &manager,
        UpdateWaTemplate {
            id: template.id,
            footer_text: Some(Some("Reply STOP".into())),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let cleared = lifecycle::update_template(
        &pool,
        &manager,
        UpdateWaTemplate {
            id: template.id,
            footer_text: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(cleared.footer_text, None);
    assert_eq!(cleared.version, 3);
    assert_eq!(
        cleared.components,
        serde_json::json!([{ "type": "BODY", "text": "Hello {{1}}" }])
    );
    let latest = &events(&pool, template.id).await[0];
    assert_eq!(latest.metadata["changed_fields"], serde_json::json!(["footer_text"]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_with_stale_version_conflicts(pool: PgPool) {
    let template = create(&pool, "welcome").await;

    let result = lifecycle::update_template(
        &pool,
        &actor(1, TENANT, "manager"),
        UpdateWaTemplate {
            id: template.id,
            body_text: Some("Changed".into()),
            expected_version: Some(7),
            ..Default::default()
        },
    )
    .await;

    assert_matches!(result, Err(AppError::Core(CoreError::Conflict(_))));
    let after = reload(&pool, template.id).await;
    assert_eq!(after.version, 1);
    assert_eq!(after.body_text, "Hello {{1}}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_validates_merged_content(pool: PgPool) {
    let template = create(&pool, "welcome").await;

    let result = lifecycle::update_template(
        &pool,
        &actor(1, TENANT, "manager"),
        UpdateWaTemplate {
            id: template.id,
            name: Some("Bad Name".into()),
            ..Default::default()
        },
    )
    .await;
    assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approved_template_rejects_update(pool: PgPool) {
    let gateway = FakeGateway::default();
    let manager = actor(1, TENANT, "manager");
    let template = create(&pool, "welcome").await;

    let outcome = submission::submit_template(&pool, &gateway, &manager, template.id, None)
        .await
        .unwrap();
    gateway.set_remote(vec![remote_template(
        &outcome.meta_template_id,
        "welcome",
        "APPROVED",
        Some("GREEN"),
    )]);
    reconcile::sync_templates(&pool, &gateway, &manager).await.unwrap();

    let approved = reload(&pool, template.id).await;
    assert_eq!(approved.status, "approved");
    assert!(approved.is_locked);
    assert!(approved.approved_at.is_some());

    let result = lifecycle::update_template(
        &pool,
        &manager,
        UpdateWaTemplate {
            id: template.id,
            body_text: Some("Sneaky edit".into()),
            ..Default::default()
        },
    )
    .await;
    assert_matches!(result, Err(AppError::Core(CoreError::Locked(_))));

    let after = reload(&pool, template.id).await;
    assert_eq!(after.version, approved.version);
    assert_eq!(after.body_text, approved.body_text);
    assert_eq!(after.components, approved.components);
}

// ---------------------------------------------------------------------------
// Submit saga
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_success_ends_pending_and_locked(pool: PgPool) {
    let gateway = FakeGateway::default();
    let template = create(&pool, "order_update").await;

    let outcome = submission::submit_template(
        &pool,
        &gateway,
        &actor(1, TENANT, "manager"),
        template.id,
        Some(1),
    )
    .await
    .unwrap();

    let after = reload(&pool, template.id).await;
    assert_eq!(after.status, "pending");
    assert!(after.is_locked);
    assert_eq!(after.meta_template_id.as_deref(), Some(outcome.meta_template_id.as_str()));
    assert_eq!(after.meta_template_name.as_deref(), Some("order_update"));
    assert_eq!(after.rejection_reason, None);
    assert!(after.submitted_at.is_some());

    let sent = gateway.submitted();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name, "order_update");
    assert_eq!(sent[0].category, "UTILITY");
    assert_eq!(sent[0].language, "ar");

    let events = events(&pool, template.id).await;
    let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, ["meta_accepted", "submitted", "created"]);
    assert_eq!(events[0].event_source, "meta_api");
    assert_eq!(events[0].correlation_id, events[1].correlation_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_remote_rejection_reverts_to_draft(pool: PgPool) {
    let gateway = FakeGateway::default();
    gateway.fail_next_submit(remote_rejection("Invalid parameter"));
    let manager = actor(1, TENANT, "manager");
    let template = create(&pool, "order_update").await;

    let result = submission::submit_template(&pool, &gateway, &manager, template.id, None).await;
    assert_matches!(result, Err(AppError::Gateway(MetaApiError::Api { status: 400, .. })));

    let after = reload(&pool, template.id).await;
    assert_eq!(after.status, "draft");
    assert_eq!(after.rejection_reason.as_deref(), Some("Invalid parameter"));
    assert!(!after.is_locked);
    assert_eq!(after.meta_template_id, None);

    let events = events(&pool, template.id).await;
    assert_eq!(events[0].event_type, "submit_failed");
    assert_eq!(events[0].event_source, "meta_api");
    assert_eq!(events[0].new_status.as_deref(), Some("draft"));
    assert_eq!(events[1].event_type, "submitted");
    assert_eq!(events[0].correlation_id, events[1].correlation_id);

    // The template stays resubmittable.
    let retry = submission::submit_template(&pool, &gateway, &manager, template.id, None).await;
    assert!(retry.is_ok());
    assert_eq!(reload(&pool, template.id).await.rejection_reason, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_network_failure_is_logged_as_submit_error(pool: PgPool) {
    let gateway = FakeGateway::default();
    gateway.fail_next_submit(MetaApiError::Transport("connection refused".into()));
    let template = create(&pool, "order_update").await;

    let result = submission::submit_template(
        &pool,
        &gateway,
        &actor(1, TENANT, "manager"),
        template.id,
        None,
    )
    .await;
    assert_matches!(result, Err(AppError::Gateway(err)) if err.is_transient());

    let after = reload(&pool, template.id).await;
    assert_eq!(after.status, "draft");
    assert_eq!(after.rejection_reason.as_deref(), Some(NETWORK_ERROR_REASON));

    let latest = &events(&pool, template.id).await[0];
    assert_eq!(latest.event_type, "submit_error");
    assert_eq!(latest.event_source, "system");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_credentials_are_logged_as_submit_error(pool: PgPool) {
    let gateway = FakeGateway::default();
    gateway.fail_next_submit(MetaApiError::NotConfigured("WHATSAPP_ACCESS_TOKEN"));
    let template = create(&pool, "order_update").await;

    let result = submission::submit_template(
        &pool,
        &gateway,
        &actor(1, TENANT, "manager"),
        template.id,
        None,
    )
    .await;
    assert_matches!(result, Err(AppError::Gateway(MetaApiError::NotConfigured(_))));

    let after = reload(&pool, template.id).await;
    assert_eq!(after.status, "draft");
    let latest = &events(&pool, template.id).await[0];
    assert_eq!(latest.event_type, "submit_error");
    assert_eq!(latest.event_source, "system");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_undecodable_content_is_never_reserved(pool: PgPool) {
    let gateway = FakeGateway::default();
    let template = create(&pool, "order_update").await;
    sqlx::query("UPDATE wa_templates SET buttons = '{\"bogus\": true}'::jsonb WHERE id = $1")
        .bind(template.id)
        .execute(&pool)
        .await
        .unwrap();

    let result = submission::submit_template(
        &pool,
        &gateway,
        &actor(1, TENANT, "manager"),
        template.id,
        None,
    )
    .await;
    assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))));

    assert_eq!(reload(&pool, template.id).await.status, "draft");
    assert!(gateway.submitted().is_empty());
    let types: Vec<_> = events(&pool, template.id)
        .await
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, ["created"]);
}

/// Runs a full sync while the registration call is outstanding.
struct SyncDuringSubmit {
    pool: PgPool,
    actor: AuthUser,
    remote: FakeGateway,
    meta_template_id: String,
}

#[async_trait]
impl TemplateGateway for SyncDuringSubmit {
    async fn submit_template(
        &self,
        request: &SubmitTemplateRequest,
    ) -> Result<SubmitTemplateResponse, MetaApiError> {
        let report = reconcile::sync_templates(&self.pool, &self.remote, &self.actor)
            .await
            .expect("sync should succeed");
        assert_eq!(report.skipped, 1);
        assert_eq!(report.updated, 0);
        Ok(SubmitTemplateResponse {
            id: self.meta_template_id.clone(),
            status: Some("PENDING".to_string()),
            category: Some(request.category.clone()),
        })
    }

    async fn list_remote_templates(&self) -> Result<Vec<RemoteTemplate>, MetaApiError> {
        self.remote.list_remote_templates().await
    }

    async fn delete_remote_template(&self, name: &str) -> Result<(), MetaApiError> {
        self.remote.delete_remote_template(name).await
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sync_leaves_in_flight_resubmission_alone(pool: PgPool) {
    let gateway = FakeGateway::default();
    let manager = actor(1, TENANT, "manager");
    let template = create(&pool, "welcome").await;

    let first = submission::submit_template(&pool, &gateway, &manager, template.id, None)
        .await
        .unwrap();
    let rejected = vec![remote_template(
        &first.meta_template_id,
        "welcome",
        "REJECTED",
        None,
    )];
    gateway.set_remote(rejected.clone());
    reconcile::sync_templates(&pool, &gateway, &manager).await.unwrap();
    assert_eq!(reload(&pool, template.id).await.status, "rejected");

    // Meta still reports the old rejection while the resubmission is in flight.
    let remote = FakeGateway::default();
    remote.set_remote(rejected);
    let racing = SyncDuringSubmit {
        pool: pool.clone(),
        actor: manager.clone(),
        remote,
        meta_template_id: first.meta_template_id.clone(),
    };

    let outcome = submission::submit_template(&pool, &racing, &manager, template.id, None)
        .await
        .expect("resubmission should be confirmed");
    assert_eq!(outcome.template.status, "pending");
    assert!(outcome.template.is_locked);

    let latest = &events(&pool, template.id).await[0];
    assert_eq!(latest.event_type, "meta_accepted");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_only_from_draft_or_rejected(pool: PgPool) {
    let gateway = FakeGateway::default();
    let manager = actor(1, TENANT, "manager");
    let template = create(&pool, "order_update").await;
    submission::submit_template(&pool, &gateway, &manager, template.id, None)
        .await
        .unwrap();

    let again = submission::submit_template(&pool, &gateway, &manager, template.id, None).await;
    assert_matches!(again, Err(AppError::Core(CoreError::Validation(_))));
    assert_eq!(gateway.submitted().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_in_flight_conflicts(pool: PgPool) {
    let gateway = FakeGateway::default();
    let template = create(&pool, "order_update").await;
    WaTemplateRepo::mark_submitted(&pool, TENANT, template.id, None)
        .await
        .unwrap()
        .expect("claim should succeed");

    let result = submission::submit_template(
        &pool,
        &gateway,
        &actor(1, TENANT, "manager"),
        template.id,
        None,
    )
    .await;
    assert_matches!(result, Err(AppError::Core(CoreError::Conflict(_))));
    assert!(gateway.submitted().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_with_stale_version_never_calls_remote(pool: PgPool) {
    let gateway = FakeGateway::default();
    let template = create(&pool, "order_update").await;

    let result = submission::submit_template(
        &pool,
        &gateway,
        &actor(1, TENANT, "manager"),
        template.id,
        Some(3),
    )
    .await;
    assert_matches!(result, Err(AppError::Core(CoreError::Conflict(_))));
    assert!(gateway.submitted().is_empty());
    assert_eq!(reload(&pool, template.id).await.status, "draft");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_compensate_reverts_only_submitted_rows(pool: PgPool) {
    let template = create(&pool, "order_update").await;
    WaTemplateRepo::mark_submitted(&pool, TENANT, template.id, None)
        .await
        .unwrap()
        .expect("claim should succeed");
    let correlation_id = Uuid::new_v4();
    let err = remote_rejection("Template name already exists");

    let reverted = compensate(&pool, TENANT, None, template.id, &err, correlation_id)
        .await
        .unwrap()
        .expect("submitted row should be reverted");
    assert_eq!(reverted.status, "draft");
    assert_eq!(
        reverted.rejection_reason.as_deref(),
        Some("Template name already exists")
    );

    // A second compensation finds nothing in `submitted` and writes nothing.
    let again = compensate(&pool, TENANT, None, template.id, &err, correlation_id)
        .await
        .unwrap();
    assert!(again.is_none());

    let grouped = WaTemplateEventRepo::list_by_correlation(&pool, TENANT, correlation_id)
        .await
        .unwrap();
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].event_type, "submit_failed");
    assert_eq!(grouped[0].actor_id, None);
    assert_eq!(grouped[0].metadata["details"]["code"], 100);
}

// ---------------------------------------------------------------------------
// Reads and tenancy
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_get_is_tenant_scoped(pool: PgPool) {
    let template = create(&pool, "welcome").await;

    let own = lifecycle::get_template(&pool, &actor(1, TENANT, "customer"), template.id)
        .await
        .unwrap();
    assert_eq!(own.template.id, template.id);
    assert_eq!(own.events.len(), 1);

    let other = lifecycle::get_template(&pool, &actor(2, OTHER_TENANT, "admin"), template.id).await;
    assert_matches!(other, Err(AppError::Core(CoreError::NotFound { id, .. })) if id == template.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_other_tenant_cannot_update_or_delete(pool: PgPool) {
    let gateway = FakeGateway::default();
    let template = create(&pool, "welcome").await;
    let intruder = actor(2, OTHER_TENANT, "owner");

    let update = lifecycle::update_template(
        &pool,
        &intruder,
        UpdateWaTemplate {
            id: template.id,
            body_text: Some("pwned".into()),
            ..Default::default()
        },
    )
    .await;
    assert_matches!(update, Err(AppError::Core(CoreError::NotFound { .. })));

    let delete = lifecycle::delete_template(&pool, &gateway, &intruder, template.id).await;
    assert_matches!(delete, Err(AppError::Core(CoreError::NotFound { .. })));

    assert_eq!(reload(&pool, template.id).await.status, "draft");
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_removes_remote_then_soft_deletes(pool: PgPool) {
    let gateway = FakeGateway::default();
    let admin = actor(1, TENANT, "admin");
    let template = create(&pool, "welcome").await;
    submission::submit_template(&pool, &gateway, &admin, template.id, None)
        .await
        .unwrap();

    lifecycle::delete_template(&pool, &gateway, &admin, template.id)
        .await
        .unwrap();

    assert_eq!(gateway.deleted(), ["welcome"]);
    let row = reload(&pool, template.id).await;
    assert_eq!(row.status, "deleted");
    // The remote id survives a soft delete.
    assert!(row.meta_template_id.is_some());

    let latest = &events(&pool, template.id).await[0];
    assert_eq!(latest.event_type, "deleted");
    assert_eq!(latest.old_status.as_deref(), Some("pending"));
    assert_eq!(latest.metadata["remote_deleted"], true);

    let gone = lifecycle::get_template(&pool, &admin, template.id).await;
    assert_matches!(gone, Err(AppError::Core(CoreError::NotFound { .. })));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_remote_delete_failure_does_not_block_local_delete(pool: PgPool) {
    let gateway = FakeGateway::default();
    let owner = actor(1, TENANT, "owner");
    let template = create(&pool, "welcome").await;
    submission::submit_template(&pool, &gateway, &owner, template.id, None)
        .await
        .unwrap();
    gateway.fail_next_delete(MetaApiError::Transport("timed out".into()));

    lifecycle::delete_template(&pool, &gateway, &owner, template.id)
        .await
        .unwrap();

    assert_eq!(reload(&pool, template.id).await.status, "deleted");
    assert_eq!(events(&pool, template.id).await[0].metadata["remote_deleted"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_requires_admin_role(pool: PgPool) {
    let gateway = FakeGateway::default();
    let template = create(&pool, "welcome").await;

    let result =
        lifecycle::delete_template(&pool, &gateway, &actor(1, TENANT, "manager"), template.id)
            .await;
    assert_matches!(result, Err(AppError::Core(CoreError::Forbidden(_))));
    assert_eq!(reload(&pool, template.id).await.status, "draft");
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sync_imports_and_is_idempotent(pool: PgPool) {
    let gateway = FakeGateway::default();
    gateway.set_remote(vec![
        remote_template("111", "welcome_msg", "APPROVED", Some("GREEN")),
        remote_template("222", "order_status", "PENDING", None),
        remote_template("333", "promo_blast", "REJECTED", Some("RED")),
    ]);
    let member = actor(5, TENANT, "customer");

    let first = reconcile::sync_templates(&pool, &gateway, &member).await.unwrap();
    assert_eq!((first.synced, first.created, first.updated, first.skipped), (3, 3, 0, 0));
    assert!(first.success);

    let imported = WaTemplateRepo::find_by_meta_id(&pool, TENANT, "111")
        .await
        .unwrap()
        .expect("imported row");
    assert_eq!(imported.status, "approved");
    assert_eq!(imported.quality, "high");
    assert!(imported.is_locked);
    assert_eq!(imported.created_by, None);
    assert_eq!(imported.body_text, "Hello {{1}}");
    assert_eq!(imported.language, "en_US");

    let rejected = WaTemplateRepo::find_by_meta_id(&pool, TENANT, "333")
        .await
        .unwrap()
        .expect("imported row");
    assert!(!rejected.is_locked);

    let events_after_first = event_count(&pool).await;
    assert_eq!(events_after_first, 3);

    let second = reconcile::sync_templates(&pool, &gateway, &member).await.unwrap();
    assert_eq!((second.created, second.updated), (0, 0));
    assert_eq!(event_count(&pool).await, events_after_first);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sync_applies_remote_status_changes(pool: PgPool) {
    let gateway = FakeGateway::default();
    let manager = actor(1, TENANT, "manager");
    let template = create(&pool, "order_update").await;
    let outcome = submission::submit_template(&pool, &gateway, &manager, template.id, None)
        .await
        .unwrap();

    let mut remote = remote_template(&outcome.meta_template_id, "order_update", "REJECTED", None);
    remote.rejected_reason = Some("INVALID_FORMAT".into());
    gateway.set_remote(vec![remote]);

    let result = reconcile::sync_templates(&pool, &gateway, &manager).await.unwrap();
    assert_eq!((result.created, result.updated), (0, 1));

    let after = reload(&pool, template.id).await;
    assert_eq!(after.status, "rejected");
    assert!(!after.is_locked);
    assert!(after.rejected_at.is_some());
    assert_eq!(after.rejection_reason.as_deref(), Some("INVALID_FORMAT"));
    // Local content is never overwritten by sync.
    assert_eq!(after.body_text, template.body_text);

    let latest = &events(&pool, template.id).await[0];
    assert_eq!(latest.event_type, "synced");
    assert_eq!(latest.event_source, "meta_sync");
    assert_eq!(latest.old_status.as_deref(), Some("pending"));
    assert_eq!(latest.new_status.as_deref(), Some("rejected"));
    assert_eq!(latest.metadata["remote_status"], "REJECTED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_remote_status_imports_as_pending(pool: PgPool) {
    let gateway = FakeGateway::default();
    gateway.set_remote(vec![remote_template("444", "limits", "LIMIT_EXCEEDED", None)]);

    reconcile::sync_templates(&pool, &gateway, &actor(1, TENANT, "admin"))
        .await
        .unwrap();

    let row = WaTemplateRepo::find_by_meta_id(&pool, TENANT, "444")
        .await
        .unwrap()
        .expect("imported row");
    assert_eq!(row.status, "pending");
    let imported = &events(&pool, row.id).await[0];
    assert_eq!(imported.event_type, "imported");
    assert_eq!(imported.metadata["remote_status"], "LIMIT_EXCEEDED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sync_skips_collisions_deleted_and_invalid_names(pool: PgPool) {
    let gateway = FakeGateway::default();
    let local = create(&pool, "welcome_msg").await;
    gateway.set_remote(vec![
        remote_template("111", "welcome_msg", "APPROVED", None),
        remote_template("222", "old_promo", "DELETED", None),
        remote_template("333", "Legacy-Name", "APPROVED", None),
    ]);

    let result = reconcile::sync_templates(&pool, &gateway, &actor(1, TENANT, "admin"))
        .await
        .unwrap();
    assert_eq!((result.synced, result.created, result.skipped), (3, 0, 3));

    // The local draft is left untouched.
    let after = reload(&pool, local.id).await;
    assert_eq!(after.status, "draft");
    assert_eq!(after.meta_template_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sync_never_resurrects_deleted_rows(pool: PgPool) {
    let gateway = FakeGateway::default();
    let admin = actor(1, TENANT, "admin");
    let template = create(&pool, "welcome").await;
    let outcome = submission::submit_template(&pool, &gateway, &admin, template.id, None)
        .await
        .unwrap();
    lifecycle::delete_template(&pool, &gateway, &admin, template.id)
        .await
        .unwrap();

    gateway.set_remote(vec![remote_template(
        &outcome.meta_template_id,
        "welcome",
        "APPROVED",
        None,
    )]);
    let result = reconcile::sync_templates(&pool, &gateway, &admin).await.unwrap();
    assert_eq!((result.created, result.updated, result.skipped), (0, 0, 1));
    assert_eq!(reload(&pool, template.id).await.status, "deleted");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sync_fetch_failure_changes_nothing_but_one_event(pool: PgPool) {
    let gateway = FakeGateway::default();
    let manager = actor(1, TENANT, "manager");
    let template = create(&pool, "welcome").await;
    let before = reload(&pool, template.id).await;
    let events_before = event_count(&pool).await;

    gateway.fail_next_list(MetaApiError::Transport("dns failure".into()));
    let result = reconcile::sync_templates(&pool, &gateway, &manager).await;
    assert_matches!(result, Err(AppError::Gateway(MetaApiError::Transport(_))));

    assert_eq!(event_count(&pool).await, events_before + 1);
    let failure: WaTemplateEvent = sqlx::query_as(
        "SELECT id, template_id, tenant_id, actor_id, event_type, event_source, \
                old_status, new_status, old_quality, new_quality, metadata, \
                correlation_id, created_at \
         FROM wa_template_events WHERE tenant_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(TENANT)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(failure.event_type, "sync_failed");
    assert_eq!(failure.event_source, "meta_sync");
    assert_eq!(failure.template_id, None);

    let after = reload(&pool, template.id).await;
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(after.status, before.status);
}
