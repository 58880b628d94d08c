//! Input validation utilities

use crate::utils::AppError;

/// Maximum length of a single attribute (field) name in an access request
const MAX_ATTRIBUTE_LEN: usize = 128;

/// Return the trimmed value, or a validation error naming the field when blank
pub fn require_non_blank(field: &str, value: Option<&str>) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::validation(format!("{} is required", field))),
    }
}

/// Normalize a requested attribute list into an ordered set.
///
/// Blank names are dropped and duplicates keep their first occurrence.
pub fn normalize_attributes(attributes: Vec<String>) -> Result<Vec<String>, AppError> {
    let mut seen = Vec::with_capacity(attributes.len());
    for attr in attributes {
        let attr = attr.trim();
        if attr.is_empty() {
            continue;
        }
        if attr.len() > MAX_ATTRIBUTE_LEN {
            return Err(AppError::validation(format!(
                "attribute name exceeds {} characters",
                MAX_ATTRIBUTE_LEN
            )));
        }
        if !seen.iter().any(|s: &String| s == attr) {
            seen.push(attr.to_string());
        }
    }
    Ok(seen)
}

/// Treat a blank optional field as absent; other values are trimmed
pub fn blank_as_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate an actor id supplied by a caller; blank means "use the default actor"
pub fn actor_or_default(actor: Option<&str>, default_actor: &str) -> String {
    match actor.map(str::trim) {
        Some(a) if !a.is_empty() => a.to_string(),
        _ => default_actor.to_string(),
    }
}
