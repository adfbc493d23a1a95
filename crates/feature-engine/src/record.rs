//! Transaction Records

use serde::{Deserialize, Serialize};

/// Numeric columns in the order they appear in a record and in every manifest
pub const NUMERIC_COLUMNS: [&str; 6] = ["amt", "lat", "long", "city_pop", "merch_lat", "merch_long"];

fn default_gender() -> String {
    "M".to_string()
}

fn default_job() -> String {
    "Other".to_string()
}

/// A single card transaction as received by the scoring service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction amount
    #[serde(rename = "amt", alias = "amount")]
    pub amount: f64,
    /// Cardholder latitude
    pub lat: f64,
    /// Cardholder longitude
    pub long: f64,
    /// Population of the cardholder's city
    pub city_pop: i64,
    /// Merchant latitude
    pub merch_lat: f64,
    /// Merchant longitude
    pub merch_long: f64,
    /// Merchant name
    pub merchant: String,
    /// Spending category
    pub category: String,
    /// Cardholder gender
    #[serde(default = "default_gender")]
    pub gender: String,
    /// Cardholder job title
    #[serde(default = "default_job")]
    pub job: String,
}

impl TransactionRecord {
    /// Numeric fields in `NUMERIC_COLUMNS` order
    pub fn numeric_values(&self) -> [f64; 6] {
        [
            self.amount,
            self.lat,
            self.long,
            self.city_pop as f64,
            self.merch_lat,
            self.merch_long,
        ]
    }

    /// Value of a categorical field
    pub fn categorical(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::Merchant => &self.merchant,
            CategoricalField::Category => &self.category,
            CategoricalField::Gender => &self.gender,
            CategoricalField::Job => &self.job,
        }
    }
}

/// A training row: a transaction plus its fraud label
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTransaction {
    pub record: TransactionRecord,
    /// 1 for fraud, 0 for legitimate
    pub is_fraud: u8,
}

impl LabeledTransaction {
    /// Label as a float target
    pub fn label(&self) -> f64 {
        if self.is_fraud > 0 {
            1.0
        } else {
            0.0
        }
    }
}

/// Categorical fields that are one-hot expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalField {
    Merchant,
    Category,
    Gender,
    Job,
}

impl CategoricalField {
    /// All fields in manifest order
    pub const ALL: [CategoricalField; 4] = [
        CategoricalField::Merchant,
        CategoricalField::Category,
        CategoricalField::Gender,
        CategoricalField::Job,
    ];

    /// Column prefix used for indicator columns
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalField::Merchant => "merchant",
            CategoricalField::Category => "category",
            CategoricalField::Gender => "gender",
            CategoricalField::Job => "job",
        }
    }

    /// Indicator column name for a value of this field
    pub fn column_name(&self, value: &str) -> String {
        format!("{}_{}", self.as_str(), value)
    }
}
