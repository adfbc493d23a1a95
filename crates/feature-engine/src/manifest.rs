//! Feature Manifest and Category Vocabulary
//!
//! The manifest is the ordered column list every model was trained on. It is
//! derived once from a category vocabulary and persisted next to the models.

use crate::error::EncodingError;
use crate::record::{CategoricalField, TransactionRecord, NUMERIC_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Ordered, duplicate-free list of feature column names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureManifest {
    columns: Vec<String>,
}

impl FeatureManifest {
    /// Build a manifest from explicit column names
    pub fn new(columns: Vec<String>) -> Result<Self, EncodingError> {
        if columns.is_empty() {
            return Err(EncodingError::EmptyManifest);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(EncodingError::DuplicateColumn(column.clone()));
            }
        }

        Ok(Self { columns })
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns (the width of every encoded vector)
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false for a constructed manifest
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column, if present
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Whether the column is part of the manifest
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }
}

impl TryFrom<Vec<String>> for FeatureManifest {
    type Error = EncodingError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<FeatureManifest> for Vec<String> {
    fn from(manifest: FeatureManifest) -> Self {
        manifest.columns
    }
}

/// Observed values of every categorical field
///
/// Values are kept sorted so the derived manifest does not depend on the
/// order in which rows were seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryVocabulary {
    values: BTreeMap<CategoricalField, BTreeSet<String>>,
}

impl CategoryVocabulary {
    /// Create an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the categorical values of one transaction
    pub fn observe(&mut self, record: &TransactionRecord) {
        for field in CategoricalField::ALL {
            let value = record.categorical(field);
            let known = self.values.entry(field).or_default();
            if !known.contains(value) {
                known.insert(value.to_string());
            }
        }
    }

    /// Record every transaction in a slice
    pub fn observe_all(&mut self, records: &[TransactionRecord]) {
        for record in records {
            self.observe(record);
        }
    }

    /// Fold another vocabulary into this one
    pub fn merge(&mut self, other: CategoryVocabulary) {
        for (field, values) in other.values {
            self.values.entry(field).or_default().extend(values);
        }
    }

    /// Number of distinct values seen for a field
    pub fn cardinality(&self, field: CategoricalField) -> usize {
        self.values.get(&field).map_or(0, |v| v.len())
    }

    /// Sorted values seen for a field
    pub fn values(&self, field: CategoricalField) -> impl Iterator<Item = &str> {
        self.values
            .get(&field)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Derive the manifest: numeric columns, then indicator columns per field
    pub fn to_manifest(&self) -> Result<FeatureManifest, EncodingError> {
        let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();

        for field in CategoricalField::ALL {
            columns.extend(self.values(field).map(|value| field.column_name(value)));
            debug!("Manifest field {}: {} values", field.as_str(), self.cardinality(field));
        }

        FeatureManifest::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(merchant: &str, category: &str, gender: &str, job: &str) -> TransactionRecord {
        TransactionRecord {
            amount: 10.0,
            lat: 1.0,
            long: 2.0,
            city_pop: 1000,
            merch_lat: 1.5,
            merch_long: 2.5,
            merchant: merchant.to_string(),
            category: category.to_string(),
            gender: gender.to_string(),
            job: job.to_string(),
        }
    }

    #[test]
    fn test_manifest_rejects_duplicates() {
        let result = FeatureManifest::new(vec!["amt".into(), "lat".into(), "amt".into()]);
        assert_eq!(result, Err(EncodingError::DuplicateColumn("amt".into())));
    }

    #[test]
    fn test_manifest_rejects_empty() {
        assert_eq!(FeatureManifest::new(vec![]), Err(EncodingError::EmptyManifest));
    }

    #[test]
    fn test_vocabulary_manifest_order() {
        let mut vocab = CategoryVocabulary::new();
        vocab.observe(&record("zeta", "travel", "M", "Nurse"));
        vocab.observe(&record("alpha", "food", "F", "Nurse"));

        let manifest = vocab.to_manifest().unwrap();
        let expected: Vec<String> = [
            "amt", "lat", "long", "city_pop", "merch_lat", "merch_long",
            "merchant_alpha", "merchant_zeta",
            "category_food", "category_travel",
            "gender_F", "gender_M",
            "job_Nurse",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(manifest.columns(), expected.as_slice());
    }

    #[test]
    fn test_vocabulary_order_independent() {
        let a = record("m1", "c1", "M", "j1");
        let b = record("m2", "c2", "F", "j2");

        let mut forward = CategoryVocabulary::new();
        forward.observe_all(&[a.clone(), b.clone()]);
        let mut backward = CategoryVocabulary::new();
        backward.observe_all(&[b, a]);

        assert_eq!(forward.to_manifest().unwrap(), backward.to_manifest().unwrap());
    }

    #[test]
    fn test_merge() {
        let mut left = CategoryVocabulary::new();
        left.observe(&record("m1", "c1", "M", "j1"));
        let mut right = CategoryVocabulary::new();
        right.observe(&record("m2", "c1", "M", "j1"));

        left.merge(right);
        assert_eq!(left.cardinality(CategoricalField::Merchant), 2);
        assert_eq!(left.cardinality(CategoricalField::Category), 1);
    }

    #[test]
    fn test_manifest_json_roundtrip_validates() {
        let manifest = FeatureManifest::new(vec!["amt".into(), "lat".into()]).unwrap();
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(json, r#"["amt","lat"]"#);

        let bad: Result<FeatureManifest, _> = serde_json::from_str(r#"["amt","amt"]"#);
        assert!(bad.is_err());
    }
}
