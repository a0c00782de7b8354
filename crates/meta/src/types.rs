//! Graph API wire types for `/{waba_id}/message_templates`.

use serde::{Deserialize, Serialize};

/// One entry of a template's `components` array.
///
/// Used in both directions: built locally for submission and decoded from
/// list responses. Unknown remote keys (e.g. `example`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateComponent {
    /// `HEADER`, `BODY`, `FOOTER`, or `BUTTONS`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<ComponentButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentButton {
    /// `QUICK_REPLY`, `URL`, or `PHONE_NUMBER`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Body of a template registration request.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitTemplateRequest {
    pub name: String,
    pub language: String,
    /// Uppercased category, e.g. `UTILITY`.
    pub category: String,
    pub components: Vec<TemplateComponent>,
}

/// Response to a successful registration.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitTemplateResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QualityScore {
    #[serde(default)]
    pub score: Option<String>,
}

/// A template as reported by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub quality_score: Option<QualityScore>,
    #[serde(default)]
    pub rejected_reason: Option<String>,
    #[serde(default)]
    pub components: Vec<TemplateComponent>,
}

impl RemoteTemplate {
    pub fn quality_score(&self) -> Option<&str> {
        self.quality_score.as_ref().and_then(|q| q.score.as_deref())
    }

    /// The remote reports `NONE` when a template was never rejected.
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejected_reason
            .as_deref()
            .filter(|reason| !reason.is_empty() && !reason.eq_ignore_ascii_case("NONE"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListTemplatesResponse {
    #[serde(default)]
    pub data: Vec<RemoteTemplate>,
}

/// Graph error envelope: `{"error": {"message": ..., "type": ..., "code": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_user_msg: Option<String>,
}
