//! Webhook support: subscription handshake, HMAC-SHA256 body signatures,
//! and typed template change notifications.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

/// Header carrying `sha256=<hex digest>` of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Subscription handshake
// ---------------------------------------------------------------------------

/// Query parameters of the `GET` verification request.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl SubscriptionQuery {
    /// The challenge to echo back, if the request is a valid subscription
    /// for `expected_token`.
    pub fn accept(&self, expected_token: Option<&str>) -> Option<&str> {
        let expected = expected_token?;
        let token_matches = self
            .verify_token
            .as_deref()
            .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()));
        if self.mode.as_deref() == Some("subscribe") && token_matches {
            self.challenge.as_deref()
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Missing X-Hub-Signature-256 header")]
    Missing,
    #[error("Malformed signature header")]
    Malformed,
    #[error("Signature does not match request body")]
    Mismatch,
}

/// Compute the header value (`sha256=<hex>`) for `body` under `secret`.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signature header against the raw body in constant time.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let digest = header
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .and_then(|digest| hex::decode(digest).ok())
        .ok_or(SignatureError::Malformed)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&digest).map_err(|_| SignatureError::Mismatch)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

pub const FIELD_STATUS_UPDATE: &str = "message_template_status_update";
pub const FIELD_QUALITY_UPDATE: &str = "message_template_quality_update";
pub const FIELD_CATEGORY_UPDATE: &str = "template_category_update";

/// Top-level webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    pub field: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Identifies the template a change refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub meta_template_id: Option<String>,
    pub meta_template_name: Option<String>,
}

/// A template change the service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateChange {
    Status {
        template: TemplateRef,
        /// Raw remote event, e.g. `APPROVED` or `FLAGGED`.
        event: String,
        reason: Option<String>,
    },
    Quality {
        template: TemplateRef,
        previous_score: Option<String>,
        new_score: Option<String>,
        reason: Option<String>,
    },
    Category {
        template: TemplateRef,
        previous_category: Option<String>,
        new_category: Option<String>,
    },
}

impl TemplateChange {
    pub fn template(&self) -> &TemplateRef {
        match self {
            Self::Status { template, .. }
            | Self::Quality { template, .. }
            | Self::Category { template, .. } => template,
        }
    }

    /// Decode one change. Unhandled fields and changes with no template
    /// reference yield `None`.
    pub fn from_change(change: &WebhookChange) -> Option<Self> {
        let value = &change.value;
        let template = TemplateRef {
            meta_template_id: string_field(value, "message_template_id"),
            meta_template_name: string_field(value, "message_template_name"),
        };
        if template.meta_template_id.is_none() && template.meta_template_name.is_none() {
            return None;
        }

        match change.field.as_str() {
            FIELD_STATUS_UPDATE => Some(Self::Status {
                template,
                event: string_field(value, "event")?,
                reason: string_field(value, "reason")
                    .filter(|reason| !reason.eq_ignore_ascii_case("NONE")),
            }),
            FIELD_QUALITY_UPDATE => Some(Self::Quality {
                template,
                previous_score: string_field(value, "previous_quality_score"),
                new_score: string_field(value, "new_quality_score"),
                reason: string_field(value, "reason"),
            }),
            FIELD_CATEGORY_UPDATE => Some(Self::Category {
                template,
                previous_category: string_field(value, "previous_category"),
                new_category: string_field(value, "new_category"),
            }),
            _ => None,
        }
    }
}

impl WebhookPayload {
    /// All recognised template changes across every entry, in delivery order.
    pub fn template_changes(&self) -> Vec<TemplateChange> {
        self.entry
            .iter()
            .flat_map(|entry| entry.changes.iter())
            .filter_map(|change| {
                let parsed = TemplateChange::from_change(change);
                if parsed.is_none() {
                    tracing::debug!(field = %change.field, "Skipping unhandled webhook change");
                }
                parsed
            })
            .collect()
    }
}

/// Read a string field that the remote may send as a JSON string or number.
fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
