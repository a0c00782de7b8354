//! REST client for the Graph API message-template endpoints.
//!
//! Wraps registration, listing and deletion of templates under
//! `{graph_url}/{api_version}/{waba_id}/message_templates` using [`reqwest`].
//! No retries are attempted; callers decide how to recover.

use std::time::Duration;

use crate::config::MetaConfig;
use crate::types::{
    GraphErrorEnvelope, ListTemplatesResponse, RemoteTemplate, SubmitTemplateRequest,
    SubmitTemplateResponse,
};

/// Page size requested from the list endpoint. Only the first page is read.
pub const LIST_PAGE_LIMIT: u32 = 100;

/// Errors from the Graph API layer.
#[derive(Debug, thiserror::Error)]
pub enum MetaApiError {
    /// The request never produced a response (connect, DNS, TLS, timeout).
    #[error("Network error talking to Meta API: {0}")]
    Transport(String),

    /// The Graph API answered with a non-2xx status.
    #[error("Meta API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// The remote `error` object, or the raw body when it was not JSON.
        details: serde_json::Value,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("Unexpected Meta API response: {0}")]
    Decode(String),

    /// A required credential is missing from configuration.
    #[error("Meta API is not configured: {0} is missing")]
    NotConfigured(&'static str),
}

impl MetaApiError {
    /// Network-class failures, where the remote state is unknown and the
    /// caller should retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Remote error payload to surface to the caller, if any.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for MetaApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// HTTP client for one WhatsApp Business Account.
pub struct MetaGraphApi {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    waba_id: Option<String>,
}

impl MetaGraphApi {
    /// Build a client from configuration, applying the configured timeout.
    pub fn new(config: &MetaConfig) -> Result<Self, MetaApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &MetaConfig) -> Self {
        Self {
            client,
            base_url: config.versioned_base_url(),
            access_token: config.access_token.clone(),
            waba_id: config.waba_id.clone(),
        }
    }

    /// Register a template for review. Returns the remote template id.
    pub async fn submit_template(
        &self,
        request: &SubmitTemplateRequest,
    ) -> Result<SubmitTemplateResponse, MetaApiError> {
        let (url, token) = self.templates_endpoint()?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the first page of the account's templates.
    pub async fn list_templates(&self) -> Result<Vec<RemoteTemplate>, MetaApiError> {
        let (url, token) = self.templates_endpoint()?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("limit", LIST_PAGE_LIMIT)])
            .send()
            .await?;

        let body: ListTemplatesResponse = Self::parse_response(response).await?;
        Ok(body.data)
    }

    /// Delete every language variant of a template by name.
    pub async fn delete_template(&self, name: &str) -> Result<(), MetaApiError> {
        let (url, token) = self.templates_endpoint()?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(token)
            .query(&[("name", name)])
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    fn templates_endpoint(&self) -> Result<(String, &str), MetaApiError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(MetaApiError::NotConfigured("WHATSAPP_ACCESS_TOKEN"))?;
        let waba_id = self
            .waba_id
            .as_deref()
            .ok_or(MetaApiError::NotConfigured("WHATSAPP_BUSINESS_ACCOUNT_ID"))?;
        Ok((format!("{}/{waba_id}/message_templates", self.base_url), token))
    }

    /// Return the response unchanged on success, or an
    /// [`MetaApiError::Api`] built from the error body.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, MetaApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(api_error_from_body(status.as_u16(), &body));
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MetaApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), MetaApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// Build an [`MetaApiError::Api`] from a non-2xx response body.
///
/// Prefers the Graph `error.error_user_msg`, then `error.message`, then the
/// raw body.
pub fn api_error_from_body(status: u16, body: &str) -> MetaApiError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let envelope: Option<GraphErrorEnvelope> = parsed
        .as_ref()
        .and_then(|value| serde_json::from_value(value.clone()).ok());

    let message = envelope
        .as_ref()
        .and_then(|e| e.error.error_user_msg.clone().or_else(|| e.error.message.clone()))
        .unwrap_or_else(|| format!("HTTP {status}"));

    let details = match parsed {
        Some(mut value) if value.get("error").is_some() => value["error"].take(),
        Some(value) => value,
        None => serde_json::Value::String(body.to_string()),
    };

    MetaApiError::Api {
        status,
        message,
        details,
    }
}
