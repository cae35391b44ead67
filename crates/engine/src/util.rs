//! Internal helpers for model validation.
//!
//! These utilities are **not** part of the public API. Every service calls
//! them explicitly before touching the database, so a row is never written
//! without having passed the same checks.

use url::Url;

use crate::{EngineError, ResultEngine};

/// Trim `value` and require at least `min` characters (not bytes).
pub(crate) fn require_min_chars(value: &str, min: usize, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() < min {
        return Err(EngineError::Validation(format!(
            "{label} must contain at least {min} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Reject values longer than `max` characters.
pub(crate) fn require_max_chars(value: &str, max: usize, label: &str) -> ResultEngine<()> {
    if value.chars().count() > max {
        return Err(EngineError::Validation(format!(
            "{label} must contain at most {max} characters"
        )));
    }
    Ok(())
}

/// Trim an optional text, mapping blank input to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Validate an optional image URL: blank means "no image", anything else must
/// be an absolute `http`/`https` URL with a host.
pub(crate) fn normalize_image_url(value: Option<&str>) -> ResultEngine<Option<String>> {
    let Some(raw) = normalize_optional_text(value) else {
        return Ok(None);
    };
    let parsed = Url::parse(&raw)
        .map_err(|_| EngineError::Validation(format!("invalid image url: {raw}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(EngineError::Validation(format!("invalid image url: {raw}")));
    }
    Ok(Some(raw))
}
