//! Mapping between local template fields and Graph template components,
//! plus the remote status and quality vocabularies.

use waba_core::template_content::{ButtonKind, HeaderKind, TemplateButton, TemplateContent};
use waba_core::template_status::{TemplateQuality, TemplateStatus};

use crate::types::{ComponentButton, TemplateComponent};

pub const HEADER: &str = "HEADER";
pub const BODY: &str = "BODY";
pub const FOOTER: &str = "FOOTER";
pub const BUTTONS: &str = "BUTTONS";

/// Build the ordered component list `[HEADER?, BODY, FOOTER?, BUTTONS?]`.
pub fn build_components(content: &TemplateContent) -> Vec<TemplateComponent> {
    let mut components = Vec::with_capacity(4);

    if content.header_type != HeaderKind::None {
        components.push(TemplateComponent {
            kind: HEADER.into(),
            format: Some(content.header_type.as_str().to_ascii_uppercase()),
            text: match content.header_type {
                HeaderKind::Text => content.header_content.clone(),
                _ => None,
            },
            buttons: None,
        });
    }

    components.push(TemplateComponent {
        kind: BODY.into(),
        format: None,
        text: Some(content.body_text.clone()),
        buttons: None,
    });

    if let Some(footer) = content.footer_text.as_deref().filter(|f| !f.is_empty()) {
        components.push(TemplateComponent {
            kind: FOOTER.into(),
            format: None,
            text: Some(footer.to_string()),
            buttons: None,
        });
    }

    if !content.buttons.is_empty() {
        components.push(TemplateComponent {
            kind: BUTTONS.into(),
            format: None,
            text: None,
            buttons: Some(content.buttons.iter().map(to_component_button).collect()),
        });
    }

    components
}

fn to_component_button(button: &TemplateButton) -> ComponentButton {
    ComponentButton {
        kind: button.kind.as_str().to_ascii_uppercase(),
        text: button.text.clone(),
        url: button.url.clone(),
        phone_number: button.phone_number.clone(),
    }
}

/// Recover local content fields from a remote component list (import).
pub fn fields_from_components(components: &[TemplateComponent]) -> TemplateContent {
    let mut content = TemplateContent::default();

    for component in components {
        match component.kind.to_ascii_uppercase().as_str() {
            HEADER => {
                content.header_type = component
                    .format
                    .as_deref()
                    .and_then(|format| format.parse().ok())
                    .unwrap_or_default();
                content.header_content = component.text.clone();
            }
            BODY => content.body_text = component.text.clone().unwrap_or_default(),
            FOOTER => content.footer_text = component.text.clone(),
            BUTTONS => {
                content.buttons = component
                    .buttons
                    .iter()
                    .flatten()
                    .map(|button| TemplateButton {
                        kind: ButtonKind::from_any(&button.kind),
                        text: button.text.clone(),
                        url: button.url.clone(),
                        phone_number: button.phone_number.clone(),
                    })
                    .collect();
            }
            other => tracing::debug!(component = other, "Ignoring unsupported template component"),
        }
    }

    content
}

/// Map a remote status to the local lifecycle status.
///
/// Case-insensitive. Unrecognised values fall back to `pending` and are
/// logged so new remote states surface in the logs.
pub fn map_remote_status(remote: &str) -> TemplateStatus {
    match remote.to_ascii_uppercase().as_str() {
        "APPROVED" | "REINSTATED" => TemplateStatus::Approved,
        "PENDING" | "IN_APPEAL" => TemplateStatus::Pending,
        "REJECTED" => TemplateStatus::Rejected,
        "PAUSED" | "FLAGGED" => TemplateStatus::Paused,
        "DISABLED" | "PENDING_DELETION" => TemplateStatus::Disabled,
        "DELETED" => TemplateStatus::Deleted,
        _ => {
            tracing::warn!(remote_status = remote, "Unknown remote template status, treating as pending");
            TemplateStatus::Pending
        }
    }
}

/// Map a remote quality score (`HIGH`/`GREEN`, ...) to the local rating.
pub fn map_remote_quality(score: Option<&str>) -> TemplateQuality {
    match score.map(str::to_ascii_uppercase).as_deref() {
        Some("HIGH" | "GREEN") => TemplateQuality::High,
        Some("MEDIUM" | "YELLOW") => TemplateQuality::Medium,
        Some("LOW" | "RED") => TemplateQuality::Low,
        _ => TemplateQuality::Unknown,
    }
}
