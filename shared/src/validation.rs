//! Shape checks for values decoded from storage.
//!
//! Anything read back from a [`crate::capabilities::KvBackend`] crossed a trust
//! boundary: another build, a user, or a failing disk may have written it. These
//! predicates decide whether a decoded value can be trusted as a whole; they never
//! repair a record field by field and never panic.

use serde_json::Value;
use thiserror::Error;

/// A predicate over an untrusted decoded value.
pub type Validator = fn(&Value) -> bool;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("unknown screen: {0}")]
    UnknownScreen(String),
    #[error("invalid text size: {0}")]
    InvalidTextSize(String),
}

#[must_use]
pub fn is_valid_text_size(value: &Value) -> bool {
    matches!(value.as_str(), Some("normal" | "large" | "xl"))
}

#[must_use]
pub fn is_accessibility_settings(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    obj.get("textSize").is_some_and(is_valid_text_size)
        && obj.get("highContrast").is_some_and(Value::is_boolean)
        && obj.get("reduceMotion").is_some_and(Value::is_boolean)
        && obj.get("narration").is_some_and(Value::is_boolean)
}

/// `standards` is optional and deliberately not checked here.
#[must_use]
pub fn is_journal_entry(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    obj.get("id").is_some_and(Value::is_string)
        && obj.get("plantName").is_some_and(Value::is_string)
        && obj.get("date").is_some_and(Value::is_string)
        && matches!(
            obj.get("route").and_then(Value::as_str),
            Some("cultural" | "stem")
        )
        && obj.get("notes").is_some_and(Value::is_string)
}

#[must_use]
pub fn is_journal_entry_list(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|entries| entries.iter().all(is_journal_entry))
}

#[must_use]
pub fn is_theme_mode(value: &Value) -> bool {
    matches!(value.as_str(), Some("light" | "dark"))
}

/// The camera slice is stored as bare `true`/`false` text and matched literally.
#[must_use]
pub fn is_camera_flag(raw: &str) -> bool {
    raw == "true" || raw == "false"
}

/// Truncates to `max_len` characters, then trims surrounding whitespace.
#[must_use]
pub fn sanitize_string(input: &str, max_len: usize) -> String {
    let truncated: String = input.chars().take(max_len).collect();
    truncated.trim().to_string()
}
