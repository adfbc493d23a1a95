//! Transaction Record Validator

use crate::error::ValidationError;
use feature_engine::{CategoricalField, TransactionRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
///
/// Finiteness, non-negative population and non-empty categorical values are
/// always enforced. The optional bounds are off unless configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Transaction amount bounds
    pub amount_range: Option<(f64, f64)>,
    /// Latitude bounds (degrees), applies to cardholder and merchant
    pub latitude_range: Option<(f64, f64)>,
    /// Longitude bounds (degrees), applies to cardholder and merchant
    pub longitude_range: Option<(f64, f64)>,
    /// Upper bound on city population
    pub max_city_pop: Option<i64>,
    /// Maximum length of a categorical value
    pub max_text_length: Option<usize>,
}

/// Result of validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid(fields_checked: usize) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_checked,
        }
    }

    /// Create an invalid result with errors
    pub fn invalid(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: false,
            errors,
            fields_checked,
        }
    }
}

/// Validator for incoming transaction records
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a numeric value: always finite, within `range` when given
    pub fn validate_number(
        &self,
        field: &'static str,
        value: f64,
        range: Option<(f64, f64)>,
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite(field));
        }
        match range {
            Some((min, max)) if value < min || value > max => Err(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            }),
            _ => Ok(()),
        }
    }

    /// Validate the city population: never negative, capped when configured
    pub fn validate_population(&self, value: i64) -> Result<(), ValidationError> {
        let max = self.config.max_city_pop.unwrap_or(i64::MAX);
        if value < 0 || value > max {
            Err(ValidationError::OutOfRange {
                field: "city_pop",
                value: value as f64,
                min: 0.0,
                max: max as f64,
            })
        } else {
            Ok(())
        }
    }

    /// Validate a categorical value
    pub fn validate_text(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field));
        }
        if let Some(max) = self.config.max_text_length {
            let length = value.chars().count();
            if length > max {
                return Err(ValidationError::TooLong { field, length, max });
            }
        }
        Ok(())
    }

    /// Validate every field of a record, collecting all errors
    pub fn validate_record(&self, record: &TransactionRecord) -> ValidationResult {
        let numeric = [
            ("amt", record.amount, self.config.amount_range),
            ("lat", record.lat, self.config.latitude_range),
            ("long", record.long, self.config.longitude_range),
            ("merch_lat", record.merch_lat, self.config.latitude_range),
            ("merch_long", record.merch_long, self.config.longitude_range),
        ];

        let mut errors = Vec::new();
        for (field, value, range) in numeric {
            if let Err(e) = self.validate_number(field, value, range) {
                errors.push(e);
            }
        }
        if let Err(e) = self.validate_population(record.city_pop) {
            errors.push(e);
        }

        for field in CategoricalField::ALL {
            if let Err(e) = self.validate_text(field.as_str(), record.categorical(field)) {
                errors.push(e);
            }
        }

        let fields_checked = numeric.len() + 1 + CategoricalField::ALL.len();
        if errors.is_empty() {
            ValidationResult::valid(fields_checked)
        } else {
            debug!("Record rejected with {} validation errors", errors.len());
            ValidationResult::invalid(errors, fields_checked)
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record() -> TransactionRecord {
        TransactionRecord {
            amount: 75.5,
            lat: 40.7128,
            long: -74.006,
            city_pop: 8_500_000,
            merch_lat: 40.7589,
            merch_long: -73.9851,
            merchant: "Amazon".to_string(),
            category: "online_retail".to_string(),
            gender: "F".to_string(),
            job: "Software Engineer".to_string(),
        }
    }

    fn first_error(validator: &Validator, r: &TransactionRecord) -> Option<ValidationError> {
        validator.validate_record(r).errors.into_iter().next()
    }

    #[test]
    fn test_valid_record() {
        let validator = Validator::default();
        let result = validator.validate_record(&record());
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.fields_checked, 10);
    }

    #[test]
    fn test_non_finite_amount() {
        let validator = Validator::default();
        let r = TransactionRecord {
            amount: f64::NAN,
            ..record()
        };
        assert_eq!(first_error(&validator, &r), Some(ValidationError::NotFinite("amt")));

        let r = TransactionRecord {
            merch_long: f64::INFINITY,
            ..record()
        };
        assert_eq!(first_error(&validator, &r), Some(ValidationError::NotFinite("merch_long")));
    }

    #[test]
    fn test_negative_population() {
        let validator = Validator::default();
        let r = TransactionRecord {
            city_pop: -5,
            ..record()
        };
        assert!(matches!(
            first_error(&validator, &r),
            Some(ValidationError::OutOfRange { field: "city_pop", .. })
        ));
        assert!(validator.validate_population(0).is_ok());
    }

    #[test]
    fn test_refund_and_unusual_values_accepted_by_default() {
        let validator = Validator::default();
        let r = TransactionRecord {
            amount: -5.0,
            lat: 123.0,
            merchant: "m".repeat(300),
            ..record()
        };
        assert!(validator.validate_record(&r).valid);
    }

    #[test]
    fn test_configured_bounds() {
        let validator = Validator::new(ValidationConfig {
            amount_range: Some((0.0, 1.0e6)),
            latitude_range: Some((-90.0, 90.0)),
            max_city_pop: Some(1_000),
            ..Default::default()
        });
        assert!(validator.validate_number("lat", 90.0, Some((-90.0, 90.0))).is_ok());
        assert!(validator.validate_number("lat", -90.0, Some((-90.0, 90.0))).is_ok());
        assert!(validator.validate_number("lat", 90.5, Some((-90.0, 90.0))).is_err());

        let r = TransactionRecord {
            amount: -5.0,
            city_pop: 1_000,
            ..record()
        };
        assert!(matches!(
            first_error(&validator, &r),
            Some(ValidationError::OutOfRange { field: "amt", .. })
        ));
        assert!(validator.validate_population(1_001).is_err());
    }

    #[test]
    fn test_empty_merchant() {
        let validator = Validator::default();
        let r = TransactionRecord {
            merchant: "   ".to_string(),
            ..record()
        };
        assert_eq!(first_error(&validator, &r), Some(ValidationError::MissingField("merchant")));
    }

    #[test]
    fn test_collects_all_errors() {
        let validator = Validator::default();
        let r = TransactionRecord {
            city_pop: -1,
            job: String::new(),
            ..record()
        };
        let result = validator.validate_record(&r);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_text_too_long() {
        let validator = Validator::new(ValidationConfig {
            max_text_length: Some(4),
            ..Default::default()
        });
        assert!(matches!(
            validator.validate_text("job", "Engineer"),
            Err(ValidationError::TooLong { length: 8, max: 4, .. })
        ));
        assert!(Validator::default().validate_text("job", "Engineer").is_ok());
    }

    proptest! {
        #[test]
        fn finite_amounts_accepted(amount in -1.0e12f64..1.0e12) {
            let validator = Validator::default();
            let r = TransactionRecord { amount, ..record() };
            prop_assert!(validator.validate_record(&r).valid);
        }
    }
}
