//! One-Hot Feature Encoder
//!
//! Turns a `TransactionRecord` into a dense vector laid out exactly like the
//! manifest. Numeric fields pass through unchanged; each categorical value
//! sets its `{field}_{value}` indicator. Values the manifest does not know
//! leave their whole indicator group at zero, and manifest columns the record
//! does not activate stay zero.

use crate::manifest::FeatureManifest;
use crate::record::{CategoricalField, TransactionRecord, NUMERIC_COLUMNS};
use ndarray::{Array1, Array2, ArrayViewMut1};
use std::collections::HashMap;
use tracing::debug;

/// Encoder bound to one manifest
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    /// Manifest the output is aligned to
    manifest: FeatureManifest,
    /// Manifest position of each numeric column (None if the manifest omits it)
    numeric_positions: [Option<usize>; NUMERIC_COLUMNS.len()],
    /// Manifest position of every known indicator, keyed by field then value
    indicator_positions: HashMap<CategoricalField, HashMap<String, usize>>,
}

impl FeatureEncoder {
    /// Create an encoder for the given manifest
    pub fn new(manifest: FeatureManifest) -> Self {
        let mut numeric_positions = [None; NUMERIC_COLUMNS.len()];
        for (slot, name) in numeric_positions.iter_mut().zip(NUMERIC_COLUMNS.iter()) {
            *slot = manifest.position(name);
        }

        let mut indicator_positions: HashMap<CategoricalField, HashMap<String, usize>> =
            HashMap::new();
        for (idx, column) in manifest.columns().iter().enumerate() {
            for field in CategoricalField::ALL {
                let prefix = field.as_str();
                if let Some(value) = column
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('_'))
                {
                    indicator_positions
                        .entry(field)
                        .or_default()
                        .insert(value.to_string(), idx);
                    break;
                }
            }
        }

        debug!(
            "Feature encoder ready: {} columns, {} indicator groups",
            manifest.len(),
            indicator_positions.len()
        );

        Self {
            manifest,
            numeric_positions,
            indicator_positions,
        }
    }

    /// Manifest this encoder writes against
    pub fn manifest(&self) -> &FeatureManifest {
        &self.manifest
    }

    /// Width of every encoded vector
    pub fn feature_count(&self) -> usize {
        self.manifest.len()
    }

    /// Manifest position of a categorical value, if the value was seen in training
    pub fn indicator_position(&self, field: CategoricalField, value: &str) -> Option<usize> {
        self.indicator_positions
            .get(&field)
            .and_then(|values| values.get(value))
            .copied()
    }

    /// Encode a single record
    pub fn encode(&self, record: &TransactionRecord) -> Array1<f64> {
        let mut row = Array1::zeros(self.feature_count());
        self.encode_into(record, row.view_mut());
        row
    }

    /// Encode a record into a zeroed row of manifest width
    pub fn encode_into(&self, record: &TransactionRecord, mut row: ArrayViewMut1<f64>) {
        debug_assert_eq!(row.len(), self.feature_count());

        for (position, value) in self.numeric_positions.iter().zip(record.numeric_values()) {
            if let Some(idx) = position {
                row[*idx] = value;
            }
        }

        for field in CategoricalField::ALL {
            if let Some(idx) = self.indicator_position(field, record.categorical(field)) {
                row[idx] = 1.0;
            }
        }
    }

    /// Encode records into a matrix, one row per record in input order
    pub fn encode_batch(&self, records: &[TransactionRecord]) -> Array2<f64> {
        let mut matrix = Array2::zeros((records.len(), self.feature_count()));
        for (record, row) in records.iter().zip(matrix.rows_mut()) {
            self.encode_into(record, row);
        }
        matrix
    }
}
