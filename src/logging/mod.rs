//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - console output, always on
//! - optional JSON file output with daily or hourly rotation
//! - `RUST_LOG` overrides the configured level
//!
//! # Example
//!
//! ```no_run
//! use ehr2row::logging::init_logging;
//! use ehr2row::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(template_id = "1001", "Document received");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a document
///
/// ```no_run
/// use ehr2row::log_document_start;
/// use ehr2row::domain::TemplateId;
///
/// let template_id = TemplateId::new("1001").unwrap();
/// log_document_start!(&template_id, Some("INST-9"));
/// ```
#[macro_export]
macro_rules! log_document_start {
    ($template_id:expr, $instance_id:expr) => {
        tracing::debug!(
            template_id = %$template_id,
            instance_id = ?$instance_id,
            "Processing document"
        );
    };
}

/// Log the completion of a document
///
/// ```no_run
/// use ehr2row::log_document_complete;
/// use std::time::Duration;
///
/// log_document_complete!("1001", 3, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_document_complete {
    ($template_id:expr, $records:expr, $duration:expr) => {
        tracing::info!(
            template_id = %$template_id,
            records = $records,
            duration_ms = $duration.as_millis() as u64,
            "Document processed"
        );
    };
}

/// Log a rule that did not fire because its condition failed to evaluate
///
/// ```no_run
/// use ehr2row::log_rule_skipped;
///
/// log_rule_skipped!("1001", "person", "null access: VALOR");
/// ```
#[macro_export]
macro_rules! log_rule_skipped {
    ($template_id:expr, $rule:expr, $reason:expr) => {
        tracing::warn!(
            template_id = %$template_id,
            rule_id = %$rule,
            reason = %$reason,
            "Rule skipped, condition could not be evaluated"
        );
    };
}

/// Log an error with context
///
/// ```no_run
/// use ehr2row::log_error_with_context;
/// use ehr2row::domain::Ehr2RowError;
///
/// let error = Ehr2RowError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::TemplateId;
    use std::time::Duration;

    #[test]
    fn test_macros_expand_without_subscriber() {
        let template_id = TemplateId::new("1001").unwrap();
        crate::log_document_start!(&template_id, None::<String>);
        crate::log_document_complete!(&template_id, 2usize, Duration::from_millis(5));
        crate::log_rule_skipped!(&template_id, "person", "boom");
        crate::log_error_with_context!(&crate::domain::Ehr2RowError::Other("x".into()), "ctx");
    }
}
