//! Normalisation and limits for client-supplied text.
//!
//! Every function trims surrounding whitespace and counts characters, not
//! bytes. Nothing here knows about reserved names; the group registry owns
//! that rule.

use crate::error::ValidationError;

/// Longest accepted display name.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;
/// Longest accepted group name.
pub const MAX_GROUP_NAME_CHARS: usize = 64;
/// Longest accepted caption.
pub const MAX_CAPTION_CHARS: usize = 500;
/// Longest accepted comment.
pub const MAX_COMMENT_CHARS: usize = 2000;

fn required(raw: &str, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }

    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }

    Ok(trimmed.to_string())
}

/// Validate a display name.
pub fn display_name(raw: &str) -> Result<String, ValidationError> {
    required(raw, "display name", MAX_DISPLAY_NAME_CHARS)
}

/// Validate a group name.
pub fn group_name(raw: &str) -> Result<String, ValidationError> {
    required(raw, "group name", MAX_GROUP_NAME_CHARS)
}

/// Validate a comment body.
pub fn comment_text(raw: &str) -> Result<String, ValidationError> {
    required(raw, "comment", MAX_COMMENT_CHARS)
}

/// Validate an optional caption. Blank captions become `None`.
pub fn caption(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => required(text, "caption", MAX_CAPTION_CHARS).map(Some),
    }
}
