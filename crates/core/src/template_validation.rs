//! Template validation rules mirroring the remote platform's constraints.
//!
//! All functions are pure; they run before any row is written.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Template names: lowercase, start with a letter, letters/digits/underscores only.
pub const NAME_PATTERN: &str = r"^[a-z][a-z0-9_]*$";

/// Positional body placeholders: `{{1}}`, `{{2}}`, ...
pub const PLACEHOLDER_PATTERN: &str = r"\{\{(\d+)\}\}";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("valid regex"));

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateValidationError {
    #[error(
        "Template name must be lowercase, start with a letter, and contain only letters, \
         numbers, and underscores (got '{0}')"
    )]
    InvalidName(String),

    #[error("Placeholders must be sequential starting from {{{{1}}}} (found {found:?})")]
    NonSequentialPlaceholders { found: Vec<u64> },

    #[error("{0} is required")]
    MissingField(&'static str),
}

impl From<TemplateValidationError> for CoreError {
    fn from(err: TemplateValidationError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Validate a template name against [`NAME_PATTERN`].
pub fn validate_name(name: &str) -> Result<(), TemplateValidationError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(TemplateValidationError::InvalidName(name.to_string()))
    }
}

/// Extract the sorted, deduplicated placeholder indices from `body_text`.
///
/// Indices too large for `u64` are returned as `u64::MAX` so they always
/// fail the sequencing check.
pub fn extract_placeholders(body_text: &str) -> Vec<u64> {
    PLACEHOLDER_RE
        .captures_iter(body_text)
        .map(|caps| caps[1].parse::<u64>().unwrap_or(u64::MAX))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Validate that the body's placeholders are exactly `1..=k` for some `k >= 0`.
pub fn validate_placeholders(body_text: &str) -> Result<(), TemplateValidationError> {
    let found = extract_placeholders(body_text);
    let sequential = found
        .iter()
        .enumerate()
        .all(|(i, &n)| n == i as u64 + 1);
    if sequential {
        Ok(())
    } else {
        Err(TemplateValidationError::NonSequentialPlaceholders { found })
    }
}

/// Name and body text are mandatory on create.
pub fn validate_required(name: &str, body_text: &str) -> Result<(), TemplateValidationError> {
    if name.trim().is_empty() {
        return Err(TemplateValidationError::MissingField("name"));
    }
    if body_text.trim().is_empty() {
        return Err(TemplateValidationError::MissingField("body_text"));
    }
    Ok(())
}
