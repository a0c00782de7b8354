//! The remote template registry, as seen by the lifecycle engine.

use async_trait::async_trait;

use crate::api::{MetaApiError, MetaGraphApi};
use crate::types::{RemoteTemplate, SubmitTemplateRequest, SubmitTemplateResponse};

/// Remote operations the lifecycle engine depends on.
///
/// Implemented by [`MetaGraphApi`] in production; tests substitute an
/// in-memory double.
#[async_trait]
pub trait TemplateGateway: Send + Sync {
    /// Register a template for review and return its remote id.
    async fn submit_template(
        &self,
        request: &SubmitTemplateRequest,
    ) -> Result<SubmitTemplateResponse, MetaApiError>;

    /// List remote templates (first page only).
    async fn list_remote_templates(&self) -> Result<Vec<RemoteTemplate>, MetaApiError>;

    /// Delete a remote template by name.
    async fn delete_remote_template(&self, name: &str) -> Result<(), MetaApiError>;
}

#[async_trait]
impl TemplateGateway for MetaGraphApi {
    async fn submit_template(
        &self,
        request: &SubmitTemplateRequest,
    ) -> Result<SubmitTemplateResponse, MetaApiError> {
        MetaGraphApi::submit_template(self, request).await
    }

    async fn list_remote_templates(&self) -> Result<Vec<RemoteTemplate>, MetaApiError> {
        self.list_templates().await
    }

    async fn delete_remote_template(&self, name: &str) -> Result<(), MetaApiError> {
        self.delete_template(name).await
    }
}
