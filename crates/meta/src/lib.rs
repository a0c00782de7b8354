//! Meta Graph API integration for WhatsApp message templates.
//!
//! - [`config`]: credentials and endpoint settings loaded from the environment
//! - [`api`]: the reqwest-based Graph client
//! - [`gateway`]: the [`TemplateGateway`](gateway::TemplateGateway) seam used by the lifecycle engine
//! - [`components`]: mapping between local template fields and remote components
//! - [`webhook`]: signature verification and payload types for push notifications

pub mod api;
pub mod components;
pub mod config;
pub mod gateway;
pub mod types;
pub mod webhook;
