//! The action dispatcher for `/whatsapp-templates`.
//!
//! Every template operation shares one route and is selected by
//! `?action=`. The action is parsed into a [`TemplateAction`], then the
//! query string or JSON body into a typed [`TemplateCommand`], and an
//! exhaustive `match` routes it to the engine.

use std::fmt;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use waba_core::types::DbId;
use waba_db::models::wa_template::{CreateWaTemplate, UpdateWaTemplate, WaTemplateListParams};

use crate::engine::{lifecycle, reconcile, submission};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{StatsResponse, SubmitResponse, SuccessResponse, TemplateResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateAction {
    List,
    Get,
    Create,
    Update,
    Submit,
    Sync,
    Delete,
    Stats,
    CheckConfig,
}

impl TemplateAction {
    pub const ALL: [TemplateAction; 9] = [
        Self::List,
        Self::Get,
        Self::Create,
        Self::Update,
        Self::Submit,
        Self::Sync,
        Self::Delete,
        Self::Stats,
        Self::CheckConfig,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Submit => "submit",
            Self::Sync => "sync",
            Self::Delete => "delete",
            Self::Stats => "stats",
            Self::CheckConfig => "check-config",
        }
    }

    /// Actions that change state and must not be sent with `GET`.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::Create | Self::Update | Self::Submit | Self::Sync | Self::Delete
        )
    }
}

impl fmt::Display for TemplateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AppError::BadRequest("Invalid action".into()))
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ActionQuery {
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdInput {
    pub id: DbId,
}

#[derive(Debug, Deserialize)]
pub struct SubmitInput {
    pub id: DbId,
    pub expected_version: Option<i32>,
}

/// A parsed request. Reads take their input from the query string; writes
/// from the JSON body.
#[derive(Debug)]
pub enum TemplateCommand {
    List(WaTemplateListParams),
    Get(IdInput),
    Create(CreateWaTemplate),
    Update(UpdateWaTemplate),
    Submit(SubmitInput),
    Sync,
    Delete(IdInput),
    Stats,
    CheckConfig,
}

impl TemplateCommand {
    pub fn parse(action: TemplateAction, uri: &Uri, body: &[u8]) -> AppResult<Self> {
        Ok(match action {
            TemplateAction::List => Self::List(from_query(uri)?),
            TemplateAction::Get => Self::Get(from_query(uri)?),
            TemplateAction::Create => Self::Create(from_body(body)?),
            TemplateAction::Update => Self::Update(from_body(body)?),
            TemplateAction::Submit => Self::Submit(from_body(body)?),
            TemplateAction::Sync => Self::Sync,
            TemplateAction::Delete => Self::Delete(from_body(body)?),
            TemplateAction::Stats => Self::Stats,
            TemplateAction::CheckConfig => Self::CheckConfig,
        })
    }
}

fn from_query<T: DeserializeOwned>(uri: &Uri) -> AppResult<T> {
    Query::<T>::try_from_uri(uri)
        .map(|Query(value)| value)
        .map_err(|e| AppError::BadRequest(format!("Invalid query parameters: {}", e.body_text())))
}

fn from_body<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// GET|POST /api/v1/whatsapp-templates?action=...
pub async fn dispatch(
    auth: AuthUser,
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> AppResult<Response> {
    let action: TemplateAction = from_query::<ActionQuery>(&uri)?
        .action
        .ok_or_else(|| AppError::BadRequest("Invalid action".into()))?
        .parse()?;

    if action.is_write() && method == Method::GET {
        return Err(AppError::BadRequest(format!(
            "Action '{action}' requires a POST request"
        )));
    }

    let command = TemplateCommand::parse(action, &uri, &body)?;
    tracing::debug!(
        action = %action,
        user_id = auth.user_id,
        tenant_id = auth.tenant_id,
        "Dispatching template action",
    );

    let pool = &state.pool;
    let gateway = state.gateway.as_ref();

    let response = match command {
        TemplateCommand::List(params) => {
            Json(lifecycle::list_templates(pool, &auth, &params).await?).into_response()
        }
        TemplateCommand::Get(IdInput { id }) => {
            Json(lifecycle::get_template(pool, &auth, id).await?).into_response()
        }
        TemplateCommand::Create(input) => {
            let template = lifecycle::create_template(pool, &auth, input).await?;
            (StatusCode::CREATED, Json(TemplateResponse { template })).into_response()
        }
        TemplateCommand::Update(input) => {
            let template = lifecycle::update_template(pool, &auth, input).await?;
            Json(TemplateResponse { template }).into_response()
        }
        TemplateCommand::Submit(SubmitInput {
            id,
            expected_version,
        }) => {
            let outcome =
                submission::submit_template(pool, gateway, &auth, id, expected_version).await?;
            Json(SubmitResponse {
                success: true,
                meta_template_id: outcome.meta_template_id,
                message: "Template submitted to Meta for review".into(),
                template: outcome.template,
            })
            .into_response()
        }
        TemplateCommand::Sync => {
            Json(reconcile::sync_templates(pool, gateway, &auth).await?).into_response()
        }
        TemplateCommand::Delete(IdInput { id }) => {
            lifecycle::delete_template(pool, gateway, &auth, id).await?;
            Json(SuccessResponse { success: true }).into_response()
        }
        TemplateCommand::Stats => {
            let stats = lifecycle::template_stats(pool, &auth).await?;
            Json(StatsResponse { stats }).into_response()
        }
        TemplateCommand::CheckConfig => Json(state.config.meta.check()).into_response(),
    };
    Ok(response)
}
