use std::sync::Arc;

use waba_meta::gateway::TemplateGateway;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: waba_db::DbPool,
    /// Server configuration, including the Meta credentials.
    pub config: Arc<ServerConfig>,
    /// Remote template registry (the Graph API in production).
    pub gateway: Arc<dyn TemplateGateway>,
}
