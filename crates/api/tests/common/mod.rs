#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use waba_api::auth::jwt::{generate_access_token, JwtConfig};
use waba_api::config::ServerConfig;
use waba_api::middleware::auth::AuthUser;
use waba_api::router::build_app_router;
use waba_api::state::AppState;
use waba_core::types::DbId;
use waba_meta::api::MetaApiError;
use waba_meta::config::MetaConfig;
use waba_meta::gateway::TemplateGateway;
use waba_meta::types::{
    QualityScore, RemoteTemplate, SubmitTemplateRequest, SubmitTemplateResponse,
    TemplateComponent,
};
use waba_meta::webhook::{compute_signature, SIGNATURE_HEADER};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";
pub const TEST_APP_SECRET: &str = "test-app-secret";
pub const TEST_VERIFY_TOKEN: &str = "verify-token-123";

pub const TEMPLATES_URL: &str = "/api/v1/whatsapp-templates";
pub const WEBHOOK_URL: &str = "/api/v1/whatsapp-templates/webhook";

/// Build a test `ServerConfig` with safe defaults and plausible Meta
/// credentials.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        meta: MetaConfig {
            access_token: Some("EAAG-test-access-token".to_string()),
            waba_id: Some("1029384756".to_string()),
            phone_number_id: Some("5550001234".to_string()),
            verify_token: Some(TEST_VERIFY_TOKEN.to_string()),
            app_secret: Some(TEST_APP_SECRET.to_string()),
            ..MetaConfig::from_lookup(|_| None)
        },
    }
}

/// Build the full application router backed by a fresh [`FakeGateway`].
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, Arc::new(FakeGateway::default()))
}

/// Build the full application router with the given gateway.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app_with(pool: PgPool, gateway: Arc<FakeGateway>) -> Router {
    build_test_app_with_config(pool, gateway, test_config())
}

pub fn build_test_app_with_config(
    pool: PgPool,
    gateway: Arc<FakeGateway>,
    config: ServerConfig,
) -> Router {
    let gateway: Arc<dyn TemplateGateway> = gateway;
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        gateway,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

pub fn actor(user_id: DbId, tenant_id: DbId, role: &str) -> AuthUser {
    AuthUser {
        user_id,
        tenant_id,
        role: role.to_string(),
    }
}

/// A bearer token for `user_id` of `tenant_id`.
pub fn token_for(user_id: DbId, tenant_id: DbId, role: &str) -> String {
    generate_access_token(user_id, Some(tenant_id), role, &test_config().jwt)
        .expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Fake gateway
// ---------------------------------------------------------------------------

/// In-memory stand-in for the Graph API.
///
/// Submissions succeed with sequential ids unless a failure was queued.
/// Listings return whatever was set with [`FakeGateway::set_remote`].
#[derive(Default)]
pub struct FakeGateway {
    next_id: AtomicU64,
    submit_failures: Mutex<VecDeque<MetaApiError>>,
    list_failures: Mutex<VecDeque<MetaApiError>>,
    delete_failures: Mutex<VecDeque<MetaApiError>>,
    remote: Mutex<Vec<RemoteTemplate>>,
    submitted: Mutex<Vec<SubmitTemplateRequest>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn fail_next_submit(&self, err: MetaApiError) {
        self.submit_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_next_list(&self, err: MetaApiError) {
        self.list_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_next_delete(&self, err: MetaApiError) {
        self.delete_failures.lock().unwrap().push_back(err);
    }

    pub fn set_remote(&self, templates: Vec<RemoteTemplate>) {
        *self.remote.lock().unwrap() = templates;
    }

    pub fn submitted(&self) -> Vec<SubmitTemplateRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TemplateGateway for FakeGateway {
    async fn submit_template(
        &self,
        request: &SubmitTemplateRequest,
    ) -> Result<SubmitTemplateResponse, MetaApiError> {
        self.submitted.lock().unwrap().push(request.clone());
        if let Some(err) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let id = 900_000 + self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(SubmitTemplateResponse {
            id: id.to_string(),
            status: Some("PENDING".to_string()),
            category: Some(request.category.clone()),
        })
    }

    async fn list_remote_templates(&self) -> Result<Vec<RemoteTemplate>, MetaApiError> {
        if let Some(err) = self.list_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.remote.lock().unwrap().clone())
    }

    async fn delete_remote_template(&self, name: &str) -> Result<(), MetaApiError> {
        if let Some(err) = self.delete_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// A remote 400 as the Graph API reports an invalid template.
pub fn remote_rejection(message: &str) -> MetaApiError {
    MetaApiError::Api {
        status: 400,
        message: message.to_string(),
        details: serde_json::json!({ "message": message, "code": 100 }),
    }
}

/// A remote listing entry with a single body component.
pub fn remote_template(id: &str, name: &str, status: &str, score: Option<&str>) -> RemoteTemplate {
    RemoteTemplate {
        id: id.to_string(),
        name: name.to_string(),
        language: "en_US".to_string(),
        status: status.to_string(),
        category: "UTILITY".to_string(),
        quality_score: score.map(|s| QualityScore {
            score: Some(s.to_string()),
        }),
        rejected_reason: None,
        components: vec![TemplateComponent {
            kind: "BODY".to_string(),
            format: None,
            text: Some("Hello {{1}}".to_string()),
            buttons: None,
        }],
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Read a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should complete")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST a webhook body, signed with [`TEST_APP_SECRET`] unless `signature`
/// overrides it.
pub async fn post_webhook(app: Router, body: &str, signature: Option<&str>) -> Response<Body> {
    let signature = signature
        .map(str::to_string)
        .unwrap_or_else(|| compute_signature(TEST_APP_SECRET, body.as_bytes()));
    let request = Request::builder()
        .method("POST")
        .uri(WEBHOOK_URL)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// `?action=` URL for the dispatcher.
pub fn action_url(action: &str) -> String {
    format!("{TEMPLATES_URL}?action={action}")
}
