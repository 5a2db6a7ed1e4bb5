//! Input validation helpers shared by the `Create*`/`Update*` models.

use crate::error::{SwitchboardError, SwitchboardResult};

/// Maximum length for human-readable names.
pub const MAX_NAME_LEN: usize = 200;

/// Validate a tenant slug: 2–63 chars of `[a-z0-9-]`, no leading or
/// trailing hyphen.
pub fn slug(value: &str) -> SwitchboardResult<()> {
    if !(2..=63).contains(&value.len()) {
        return Err(SwitchboardError::validation(
            "slug must be between 2 and 63 characters",
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(SwitchboardError::validation(
            "slug may only contain lowercase letters, digits and hyphens",
        ));
    }
    if value.starts_with('-') || value.ends_with('-') {
        return Err(SwitchboardError::validation(
            "slug must not start or end with a hyphen",
        ));
    }
    Ok(())
}

/// Validate a non-blank name of bounded length.
pub fn name(field: &str, value: &str) -> SwitchboardResult<()> {
    if value.trim().is_empty() {
        return Err(SwitchboardError::validation(format!(
            "{field} must not be empty"
        )));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(SwitchboardError::validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Minimal structural email check; the identity provider owns real
/// verification.
pub fn email(value: &str) -> SwitchboardResult<()> {
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(SwitchboardError::validation(format!(
            "invalid email address: {value}"
        ))),
    }
}

/// JSON documents stored on entities/assets must be objects.
pub fn json_object(field: &str, value: &serde_json::Value) -> SwitchboardResult<()> {
    if value.is_object() {
        Ok(())
    } else {
        Err(SwitchboardError::validation(format!(
            "{field} must be a JSON object"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_slugs() {
        assert!(slug("acme").is_ok());
        assert!(slug("acme-bank-01").is_ok());
    }

    #[test]
    fn rejects_bad_slugs() {
        assert!(slug("a").is_err());
        assert!(slug("Acme").is_err());
        assert!(slug("-acme").is_err());
        assert!(slug("acme-").is_err());
        assert!(slug("acme bank").is_err());
        assert!(slug(&"a".repeat(64)).is_err());
    }

    #[test]
    fn blank_names_rejected() {
        assert!(name("name", "  ").is_err());
        assert!(name("name", "Support").is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(email("ana@acme.io").is_ok());
        assert!(email("ana").is_err());
        assert!(email("@acme.io").is_err());
        assert!(email("ana@localhost").is_err());
    }

    #[test]
    fn json_must_be_object() {
        assert!(json_object("schema", &serde_json::json!({"a": 1})).is_ok());
        assert!(json_object("schema", &serde_json::json!([1, 2])).is_err());
    }
}
