//! Result type alias for ehr2row
//!
//! This module provides a convenient Result type alias that uses Ehr2RowError
//! as the error type.

use super::errors::Ehr2RowError;

/// Result type alias for ehr2row operations
///
/// # Examples
///
/// ```
/// use ehr2row::domain::result::Result;
/// use ehr2row::domain::errors::Ehr2RowError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(Ehr2RowError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Ehr2RowError>;
