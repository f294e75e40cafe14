//! Domain error types
//!
//! This module defines the error hierarchy for ehr2row. Every fallible operation
//! in the crate returns [`Ehr2RowError`]; third-party error types (redis,
//! tokio-postgres, serde_json, io) are converted to string payloads at the
//! adapter boundary so they never leak through the public API.
//!
//! The taxonomy follows how each failure is recovered from:
//!
//! - [`RuleError::NotFound`] - no rule set for a template; the document yields no output
//! - [`ExpressionError`] - a condition or field mapping failed; the field is skipped or
//!   the rule does not fire
//! - [`SinkError`] - a record could not be delivered; it is presumed lost
//! - [`SourceError`] and [`RuleError::SourceFailure`] - an upstream source failed; this
//!   is surfaced to the orchestrator and is fatal for the run

use thiserror::Error;

/// Main ehr2row error type
#[derive(Debug, Error)]
pub enum Ehr2RowError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rule resolution errors
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Expression compilation or evaluation errors
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// Output sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Document source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl Ehr2RowError {
    /// Whether the error comes from an upstream source and should abort the run
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            Ehr2RowError::Source(_)
                | Ehr2RowError::Rule(RuleError::SourceFailure(_))
                | Ehr2RowError::Rule(RuleError::Malformed { .. })
        )
    }
}

/// Rule resolution errors
#[derive(Debug, Error)]
pub enum RuleError {
    /// No rule set is defined for the template
    #[error("No rule set defined for template {0}")]
    NotFound(String),

    /// A rule definition could not be parsed
    #[error("Malformed rule definition in {origin}: {message}")]
    Malformed { origin: String, message: String },

    /// The rule store could not be reached or queried
    #[error("Rule source failure: {0}")]
    SourceFailure(String),
}

/// Expression compilation and evaluation errors
///
/// These are always recovered from locally: they are logged with the rule and
/// template context and never abort the processing of a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// The expression text is not valid
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A property or index was read from null
    #[error("Cannot read '{property}' of null")]
    NullAccess { property: String },

    /// A function or helper that is not part of the sandbox was called
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// A function was called with the wrong number of arguments
    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    /// A value had the wrong type for an operation
    #[error("Type error: {0}")]
    Type(String),

    /// The accumulator is not bound in this context
    #[error("The target record is not available in conditions")]
    TargetUnavailable,
}

/// Output sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination could not be reached
    #[error("Sink unavailable on channel '{channel}': {message}")]
    Unavailable { channel: String, message: String },

    /// The dispatcher or sink has already been closed
    #[error("Sink already closed, record for channel '{0}' rejected")]
    Closed(String),

    /// Failed to connect the sink
    #[error("Failed to connect sink: {0}")]
    ConnectionFailed(String),
}

/// Document source errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to connect to the source
    #[error("Failed to connect to document source: {0}")]
    ConnectionFailed(String),

    /// Failed to read from the source
    #[error("Failed to read from document source: {0}")]
    ReadFailed(String),

    /// The source closed before signalling the end of the stream
    #[error("Document source closed unexpectedly: {0}")]
    Closed(String),
}

impl From<std::io::Error> for Ehr2RowError {
    fn from(err: std::io::Error) -> Self {
        Ehr2RowError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Ehr2RowError {
    fn from(err: serde_json::Error) -> Self {
        Ehr2RowError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Ehr2RowError {
    fn from(err: toml::de::Error) -> Self {
        Ehr2RowError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Ehr2RowError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");

        let err: Ehr2RowError = RuleError::NotFound("42".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Rule error: No rule set defined for template 42"
        );
    }

    #[test]
    fn test_expression_error_display() {
        let err = ExpressionError::NullAccess {
            property: "VALOR".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot read 'VALOR' of null");

        let err = ExpressionError::Arity {
            function: "substr".to_string(),
            expected: "2 or 3".to_string(),
            actual: 1,
        };
        assert_eq!(err.to_string(), "substr expects 2 or 3 argument(s), got 1");
    }

    #[test]
    fn test_source_failure_classification() {
        let err: Ehr2RowError = SourceError::ReadFailed("boom".to_string()).into();
        assert!(err.is_source_failure());

        let err: Ehr2RowError = RuleError::SourceFailure("db down".to_string()).into();
        assert!(err.is_source_failure());

        let err: Ehr2RowError = RuleError::NotFound("7".to_string()).into();
        assert!(!err.is_source_failure());

        let err: Ehr2RowError = SinkError::Closed("x".to_string()).into();
        assert!(!err.is_source_failure());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: Ehr2RowError = io_err.into();
        assert!(matches!(err, Ehr2RowError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Ehr2RowError = json_err.into();
        assert!(matches!(err, Ehr2RowError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: Ehr2RowError = toml_err.into();
        assert!(matches!(err, Ehr2RowError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let _: &dyn std::error::Error = &Ehr2RowError::Validation("x".to_string());
        let _: &dyn std::error::Error = &ExpressionError::TargetUnavailable;
        let _: &dyn std::error::Error = &SinkError::Closed("x".to_string());
    }
}
