//! Error context extension trait
//!
//! Adds `.context()` and `.with_context()` to any `Result` whose error converts
//! into [`Ehr2RowError`], keeping the crate error type instead of `anyhow`.
//!
//! ```rust
//! use ehr2row::domain::Result;
//! use ehr2row::domain::context::ResultExt;
//!
//! fn read_rules(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
//! }
//! # assert!(read_rules("/nonexistent/rules.json").is_err());
//! ```

use crate::domain::errors::Ehr2RowError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add lazily computed context to an error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Ehr2RowError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

/// Source failures keep their variant so the run still treats them as fatal
fn wrap(error: Ehr2RowError, context: impl std::fmt::Display) -> Ehr2RowError {
    use crate::domain::errors::SourceError;

    if error.is_source_failure() {
        Ehr2RowError::Source(SourceError::ReadFailed(format!("{context}: {error}")))
    } else {
        Ehr2RowError::Other(format!("{context}: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{RuleError, SinkError};

    #[test]
    fn test_context_keeps_both_messages() {
        let result: Result<()> = Err(Ehr2RowError::Configuration("Invalid config".to_string()));
        let err = result.context("Failed to load configuration").unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Failed to load configuration"));
        assert!(message.contains("Invalid config"));
    }

    #[test]
    fn test_with_context_is_lazy() {
        let called = std::cell::Cell::new(false);
        let result: Result<i32> = Ok(42);
        let result = result.with_context(|| {
            called.set(true);
            "never"
        });

        assert_eq!(result.unwrap(), 42);
        assert!(!called.get());
    }

    #[test]
    fn test_sink_error_context() {
        let result: std::result::Result<(), SinkError> =
            Err(SinkError::Closed("person".to_string()));
        let err = result.context("Publishing row").unwrap_err();
        assert!(matches!(err, Ehr2RowError::Other(_)));
        assert!(err.to_string().contains("Publishing row"));
    }

    #[test]
    fn test_source_failure_stays_fatal() {
        let result: std::result::Result<(), RuleError> =
            Err(RuleError::SourceFailure("db down".to_string()));
        let err = result.context("Resolving template 7").unwrap_err();
        assert!(err.is_source_failure());
        assert!(err.to_string().contains("db down"));
    }
}
