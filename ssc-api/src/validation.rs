//! Input validation types and utilities.
//!
//! Values that end up in URL paths, file system paths or entity names are
//! checked here before any request is built.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Maximum length for project and version names
pub const MAX_ENTITY_NAME_LEN: usize = 255;

/// Maximum length for a single URL path segment or file name
pub const MAX_SEGMENT_LEN: usize = 255;

/// Default number of issues requested per page
pub const DEFAULT_ISSUE_LIMIT: u32 = 20;

/// Maximum number of issues requested per page
pub const MAX_ISSUE_LIMIT: u32 = 500;

/// Maximum nesting depth accepted in a JSON response body
pub const MAX_JSON_DEPTH: usize = 64;

/// Validation errors for input data
#[derive(Debug, Error)]
#[must_use = "Need to handle all error enum types."]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    EmptyName(&'static str),

    #[error("{field} too long: {actual} chars (max: {max})")]
    NameTooLong {
        field: &'static str,
        actual: usize,
        max: usize,
    },

    #[error("Suspicious pattern in {0} (possible path traversal)")]
    SuspiciousNamePattern(&'static str),

    #[error("Invalid page limit: {0} (must be 1-{MAX_ISSUE_LIMIT})")]
    InvalidPageLimit(u32),

    #[error("Empty URL segment not allowed")]
    EmptySegment,

    #[error("URL segment too long: {actual} chars (max: {max})")]
    SegmentTooLong { actual: usize, max: usize },

    #[error("Invalid path characters (possible path traversal)")]
    InvalidPathCharacters,

    #[error("Control characters not allowed")]
    ControlCharactersNotAllowed,

    #[error("Invalid identifier '{0}': expected a positive integer")]
    InvalidIdentifier(String),

    #[error("JSON nesting too deep: {depth} levels (max: {max})")]
    JsonTooDeep { depth: usize, max: usize },
}

/// Validated name for a project or a project version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityName(String);

impl EntityName {
    /// Validates and constructs a new `EntityName`.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, contains control
    /// characters or looks like a path.
    pub fn new(name: impl Into<String>, field: &'static str) -> Result<Self, ValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName(field));
        }

        if trimmed.len() > MAX_ENTITY_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                field,
                actual: trimmed.len(),
                max: MAX_ENTITY_NAME_LEN,
            });
        }

        if trimmed.chars().any(|c| c.is_control()) {
            return Err(ValidationError::ControlCharactersNotAllowed);
        }

        if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
            return Err(ValidationError::SuspiciousNamePattern(field));
        }

        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validates a URL path segment to prevent injection.
///
/// Also used for download file names, which must be a single path component.
///
/// # Errors
///
/// Returns an error if the segment is empty, too long, contains path
/// separators, `..` or control characters.
pub fn validate_url_segment(segment: &str, max_len: usize) -> Result<&str, ValidationError> {
    if segment.is_empty() {
        return Err(ValidationError::EmptySegment);
    }

    if segment.len() > max_len {
        return Err(ValidationError::SegmentTooLong {
            actual: segment.len(),
            max: max_len,
        });
    }

    if segment.contains("..") || segment.contains('/') || segment.contains('\\') {
        return Err(ValidationError::InvalidPathCharacters);
    }

    if segment.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharactersNotAllowed);
    }

    Ok(segment)
}

/// Validates an issue page limit.
///
/// - `None` yields [`DEFAULT_ISSUE_LIMIT`]
/// - `0` is rejected
/// - values above [`MAX_ISSUE_LIMIT`] are capped with a warning
///
/// ```
/// use ssc_platform::validation::{validate_page_limit, DEFAULT_ISSUE_LIMIT, MAX_ISSUE_LIMIT};
///
/// assert_eq!(validate_page_limit(None).unwrap(), DEFAULT_ISSUE_LIMIT);
/// assert_eq!(validate_page_limit(Some(100)).unwrap(), 100);
/// assert!(validate_page_limit(Some(0)).is_err());
/// assert_eq!(validate_page_limit(Some(10_000)).unwrap(), MAX_ISSUE_LIMIT);
/// ```
///
/// # Errors
///
/// Returns an error for a limit of zero.
pub fn validate_page_limit(limit: Option<u32>) -> Result<u32, ValidationError> {
    match limit {
        None => Ok(DEFAULT_ISSUE_LIMIT),
        Some(0) => Err(ValidationError::InvalidPageLimit(0)),
        Some(l) if l > MAX_ISSUE_LIMIT => {
            log::warn!("Page limit {l} exceeds maximum {MAX_ISSUE_LIMIT}, capping to maximum");
            Ok(MAX_ISSUE_LIMIT)
        }
        Some(l) => Ok(l),
    }
}

/// Parses a numeric entity identifier (version id, report id, ...).
///
/// # Errors
///
/// Returns an error if the trimmed value is not a positive integer.
pub fn parse_entity_id(raw: &str) -> Result<u64, ValidationError> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidIdentifier(raw.to_string())),
    }
}

/// Rejects JSON documents whose arrays/objects nest deeper than `max_depth`.
///
/// Iterative so that hostile input cannot exhaust the stack while checking.
///
/// # Errors
///
/// Returns [`ValidationError::JsonTooDeep`] when the limit is exceeded.
pub fn validate_json_depth(value: &Value, max_depth: usize) -> Result<(), ValidationError> {
    let mut stack: Vec<(&Value, usize)> = vec![(value, 1)];
    while let Some((current, depth)) = stack.pop() {
        let is_container = matches!(current, Value::Array(_) | Value::Object(_));
        if is_container && depth > max_depth {
            return Err(ValidationError::JsonTooDeep {
                depth,
                max: max_depth,
            });
        }
        match current {
            Value::Array(items) => {
                stack.extend(items.iter().map(|item| (item, depth.saturating_add(1))));
            }
            Value::Object(map) => {
                stack.extend(map.values().map(|item| (item, depth.saturating_add(1))));
            }
            _ => {}
        }
    }
    Ok(())
}
