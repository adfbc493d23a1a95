//! Data Validation
//!
//! Rejects malformed transaction records before they reach the encoder.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{ValidationConfig, ValidationResult, Validator};
