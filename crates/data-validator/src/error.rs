//! Validation Error Types

use thiserror::Error;

/// Errors during record validation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite numeric value
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    /// Empty categorical value
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Categorical value longer than allowed
    #[error("{field} is {length} characters long, maximum is {max}")]
    TooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },
}
