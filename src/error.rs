//! Error types for the field-mapping engine.
//!
//! This module defines the error taxonomy used throughout the crate:
//!
//! - [`ConfigError`] - structural configuration violations (pre-flight, fatal)
//! - [`FieldError`] - type coercion / length failures on a single field
//! - [`FieldIssue`] - a per-field diagnostic collected during row transformation
//! - [`EngineError`] - top-level wrapper
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// A mapping configuration failed validation.
///
/// Carries the full list of violations, not just the first one, so a
/// configuration author can fix everything in one pass. A configuration that
/// produced this error must never be used for row transformation.
#[derive(Debug, Clone, Error)]
#[error("configuration failed validation ({} violation(s)): {}", violations.len(), violations.join("; "))]
pub struct ConfigError {
    /// Human-readable violation messages, in check order.
    pub violations: Vec<String>,
}

impl ConfigError {
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }
}

// =============================================================================
// Field Errors
// =============================================================================

/// Errors while formatting a single resolved value into its output slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Value could not be parsed as a date with the given pattern.
    #[error("cannot parse '{value}' as a date with format '{format}'")]
    InvalidDate { value: String, format: String },

    /// Value could not be parsed as a decimal number.
    #[error("cannot parse '{value}' as a number")]
    InvalidNumber { value: String },

    /// Value could not be interpreted as a boolean flag.
    #[error("cannot interpret '{value}' as a boolean")]
    InvalidBoolean { value: String },

    /// Date format pattern contains tokens the engine does not know.
    #[error("invalid date format pattern '{0}'")]
    InvalidDateFormat(String),

    /// Numeric picture clause is malformed.
    #[error("invalid numeric picture '{0}'")]
    InvalidPicture(String),

    /// Number has more integer digits than the picture allows.
    #[error("value '{value}' does not fit picture '{picture}'")]
    PictureOverflow { value: String, picture: String },

    /// Negative value in an unsigned picture.
    #[error("negative value '{value}' in unsigned picture '{picture}'")]
    UnsignedNegative { value: String, picture: String },

    /// Formatted value is longer than the declared field length.
    #[error("value is {actual} characters but field length is {length}")]
    Overflow { actual: usize, length: usize },
}

// =============================================================================
// Per-field Diagnostics
// =============================================================================

/// Severity of a [`FieldIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Degraded but recoverable; the record was still produced.
    Warning,
    /// Fatal for the record when the field is required.
    Error,
}

/// What went wrong on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Source data missing or unusable during value resolution.
    Resolution,
    /// Type coercion or pattern formatting failed.
    Format,
    /// Formatted value exceeded the declared length.
    Overflow,
    /// A conditional sub-expression could not be evaluated as intended.
    Expression,
}

/// A diagnostic attached to one field of one transformed row.
///
/// Issues are collected and returned alongside (not instead of) any partial
/// output; the batch orchestrator decides whether the error rate crosses its
/// threshold.
#[derive(Debug, Clone)]
pub struct FieldIssue {
    /// `fieldName` of the mapping the issue belongs to.
    pub field: String,
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
}

impl FieldIssue {
    pub fn warning(field: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn error(field: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}] field '{}': {}", level, self.field, self.message)
    }
}

// =============================================================================
// Engine Errors (top-level)
// =============================================================================

/// Top-level errors returned by the engine API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for single-field formatting.
pub type FieldResult<T> = Result<T, FieldError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_joins_violations() {
        let err = ConfigError::new(vec![
            "duplicate fieldName 'acct'".into(),
            "field 'amt': length must be > 0".into(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 violation(s)"));
        assert!(msg.contains("duplicate fieldName 'acct'"));
        assert!(msg.contains("length must be > 0"));
    }

    #[test]
    fn test_error_conversion_chain() {
        let config_err = ConfigError::new(vec!["empty configuration".into()]);
        let engine_err: EngineError = config_err.into();
        assert!(engine_err.to_string().contains("empty configuration"));
    }

    #[test]
    fn test_field_issue_display() {
        let issue = FieldIssue::warning("status", IssueKind::Expression, "type mismatch");
        let msg = issue.to_string();
        assert!(msg.contains("warning"));
        assert!(msg.contains("status"));
        assert!(msg.contains("type mismatch"));
    }
}
