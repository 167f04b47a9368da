//! Identifier validation for flow ids and locale codes.
//!
//! Flow ids end up inside selection tokens and catalog paths, so they follow
//! the same rules as a directory name: ASCII letters, digits and underscores.

/// Identifier validation errors with helpful messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("identifier '{value}' contains invalid characters: {chars}")]
    InvalidCharacters { value: String, chars: String },

    #[error("locale '{0}' is not a valid language tag")]
    InvalidLocale(String),
}

/// Longest flow id accepted. Telegram callback data is capped at 64 bytes and
/// the token also carries the locale and a node id.
pub const MAX_FLOW_ID_LEN: usize = 32;

/// Validate a flow id (`flow1`, `flow_1`, `MyFlow`).
pub fn validate_flow_id(id: &str) -> Result<(), IdentifierError> {
    if id.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if id.chars().count() > MAX_FLOW_ID_LEN {
        return Err(IdentifierError::TooLong {
            max: MAX_FLOW_ID_LEN,
        });
    }
    let bad: String = id
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        .collect();
    if !bad.is_empty() {
        return Err(IdentifierError::InvalidCharacters {
            value: id.to_string(),
            chars: bad,
        });
    }
    Ok(())
}

/// Validate a locale code such as `en`, `ru`, `pt-BR` or `zh_Hans`.
///
/// Only the shape is checked: a 2-3 letter primary subtag followed by
/// optional alphanumeric subtags separated by `-` or `_`.
pub fn validate_locale(locale: &str) -> Result<(), IdentifierError> {
    if locale.is_empty() {
        return Err(IdentifierError::Empty);
    }
    let mut parts = locale.split(['-', '_']);
    let primary = parts.next().unwrap_or_default();
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(IdentifierError::InvalidLocale(locale.to_string()));
    }
    for sub in parts {
        if sub.is_empty() || sub.len() > 8 || !sub.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(IdentifierError::InvalidLocale(locale.to_string()));
        }
    }
    Ok(())
}
