//! Tenant-facing template content: category, header, body, footer, buttons.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Language used when a create request does not name one.
pub const DEFAULT_LANGUAGE: &str = "ar";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    #[default]
    Utility,
    Marketing,
    Authentication,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 3] = [Self::Utility, Self::Marketing, Self::Authentication];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utility => "utility",
            Self::Marketing => "marketing",
            Self::Authentication => "authentication",
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateCategory {
    type Err = CoreError;

    /// Case-insensitive so remote values (`"MARKETING"`) parse directly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == lowered)
            .ok_or_else(|| CoreError::Validation(format!("Unknown template category '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderKind {
    #[default]
    None,
    Text,
    Image,
    Video,
    Document,
}

impl HeaderKind {
    pub const ALL: [HeaderKind; 5] = [
        Self::None,
        Self::Text,
        Self::Image,
        Self::Video,
        Self::Document,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeaderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| CoreError::Validation(format!("Unknown header type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Buttons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    #[default]
    QuickReply,
    Url,
    PhoneNumber,
}

impl ButtonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QuickReply => "quick_reply",
            Self::Url => "url",
            Self::PhoneNumber => "phone_number",
        }
    }

    /// Parse a button type in either local (`url`) or remote (`URL`) spelling.
    /// Unknown values fall back to a quick reply.
    pub fn from_any(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "url" => Self::Url,
            "phone_number" => Self::PhoneNumber,
            _ => Self::QuickReply,
        }
    }
}

/// A single call-to-action or quick-reply button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateButton {
    #[serde(rename = "type", default)]
    pub kind: ButtonKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

// ---------------------------------------------------------------------------
// Content bundle
// ---------------------------------------------------------------------------

/// The content fields that feed the remote component list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContent {
    pub header_type: HeaderKind,
    pub header_content: Option<String>,
    pub body_text: String,
    pub footer_text: Option<String>,
    pub buttons: Vec<TemplateButton>,
}

/// Parse the stored `buttons` JSON column.
pub fn buttons_from_json(value: &serde_json::Value) -> Result<Vec<TemplateButton>, CoreError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| CoreError::Validation(format!("Invalid buttons: {e}")))
}
