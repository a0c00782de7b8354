//! Audit event vocabulary for the template event log.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateEventType {
    Created,
    Updated,
    Submitted,
    SubmitFailed,
    SubmitError,
    MetaAccepted,
    Synced,
    SyncFailed,
    Imported,
    Deleted,
    StatusUpdate,
    QualityUpdate,
    CategoryUpdate,
}

impl TemplateEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Submitted => "submitted",
            Self::SubmitFailed => "submit_failed",
            Self::SubmitError => "submit_error",
            Self::MetaAccepted => "meta_accepted",
            Self::Synced => "synced",
            Self::SyncFailed => "sync_failed",
            Self::Imported => "imported",
            Self::Deleted => "deleted",
            Self::StatusUpdate => "status_update",
            Self::QualityUpdate => "quality_update",
            Self::CategoryUpdate => "category_update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateEventSource {
    User,
    MetaApi,
    MetaSync,
    MetaWebhook,
    System,
}

impl TemplateEventSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::MetaApi => "meta_api",
            Self::MetaSync => "meta_sync",
            Self::MetaWebhook => "meta_webhook",
            Self::System => "system",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_matches_serde_name() {
        for event_type in [
            TemplateEventType::SubmitFailed,
            TemplateEventType::MetaAccepted,
            TemplateEventType::CategoryUpdate,
        ] {
            let json = serde_json::to_value(event_type).unwrap();
            assert_eq!(json, event_type.as_str());
        }
        let json = serde_json::to_value(TemplateEventSource::MetaWebhook).unwrap();
        assert_eq!(json, "meta_webhook");
    }
}
