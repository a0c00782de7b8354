//! Template lifecycle status, quality rating, and transition rules.
//!
//! ```text
//! draft ──submit──▶ submitted ──accepted──▶ pending ──▶ approved | rejected
//!   ▲                   │                                          │
//!   └────compensate─────┘                     rejected ──submit──▶ submitted
//!
//! paused, disabled: only reported by the remote platform
//! deleted:          terminal, reachable from any state
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Draft,
    Submitted,
    Pending,
    Approved,
    Rejected,
    Paused,
    Disabled,
    Deleted,
}

/// Who is driving a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSource {
    /// A local lifecycle step (submit, confirm, compensate, delete).
    Local,
    /// The remote platform, via sync or webhook. The remote side is the
    /// system of record for approval state, except for a row whose
    /// submission is still in flight.
    Remote,
}

impl TemplateStatus {
    pub const ALL: [TemplateStatus; 8] = [
        Self::Draft,
        Self::Submitted,
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Paused,
        Self::Disabled,
        Self::Deleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paused => "paused",
            Self::Disabled => "disabled",
            Self::Deleted => "deleted",
        }
    }

    /// Content of a template in this status is frozen by the remote platform.
    pub fn locks_content(self) -> bool {
        matches!(self, Self::Approved | Self::Pending)
    }

    /// Only drafts and rejected templates may be (re)submitted.
    pub fn is_submittable(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Deleted
    }

    /// Statuses the remote platform can report for a registered template.
    pub fn is_remote_reported(self) -> bool {
        !matches!(self, Self::Draft | Self::Submitted)
    }

    /// Whether `self -> next` is a legal move for the given source.
    pub fn can_transition_to(self, next: TemplateStatus, source: TransitionSource) -> bool {
        if self.is_terminal() {
            return false;
        }
        match source {
            TransitionSource::Remote => self != Self::Submitted && next.is_remote_reported(),
            TransitionSource::Local => match next {
                Self::Deleted => true,
                Self::Submitted => self.is_submittable(),
                Self::Pending | Self::Draft => self == Self::Submitted,
                _ => false,
            },
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown template status '{s}'")))
    }
}

/// Validate that `current -> next` is allowed for `source`.
pub fn validate_transition(
    current: TemplateStatus,
    next: TemplateStatus,
    source: TransitionSource,
) -> Result<(), CoreError> {
    if current.can_transition_to(next, source) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot move template from '{current}' to '{next}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// Quality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateQuality {
    High,
    Medium,
    Low,
    Unknown,
}

impl TemplateQuality {
    pub const ALL: [TemplateQuality; 4] = [Self::High, Self::Medium, Self::Low, Self::Unknown];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TemplateQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateQuality {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|quality| quality.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown template quality '{s}'")))
    }
}
