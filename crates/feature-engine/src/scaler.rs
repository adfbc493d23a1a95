//! Standard Scaler
//!
//! Z-score normalization fitted once over the full training matrix:
//! `z = (x - mean) / scale`, where `scale` is the population standard
//! deviation of the column (1.0 for constant columns). The fitted
//! parameters are frozen; there is no online update.

use crate::error::EncodingError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fitted per-column mean and scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column means
    mean: Vec<f64>,
    /// Column standard deviations, zeros replaced by 1.0
    scale: Vec<f64>,
    /// Number of rows seen during fit
    samples_seen: usize,
}

impl StandardScaler {
    /// Fit on a feature matrix (rows are samples)
    pub fn fit(data: ArrayView2<f64>) -> Result<Self, EncodingError> {
        let (rows, cols) = data.dim();
        if rows == 0 {
            return Err(EncodingError::EmptyData(
                "Cannot fit StandardScaler on zero rows".to_string(),
            ));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| EncodingError::EmptyData("mean of empty axis".to_string()))?;
        let std = data.var_axis(Axis(0), 0.0).mapv(f64::sqrt);
        let scale: Vec<f64> = std
            .iter()
            .map(|&s| if s == 0.0 || !s.is_finite() { 1.0 } else { s })
            .collect();

        info!("Fitted standard scaler on {} rows x {} features", rows, cols);

        Ok(Self {
            mean: mean.to_vec(),
            scale,
            samples_seen: rows,
        })
    }

    /// Build a scaler from known parameters
    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, EncodingError> {
        if mean.len() != scale.len() {
            return Err(EncodingError::DimensionMismatch {
                expected: mean.len(),
                actual: scale.len(),
            });
        }
        Ok(Self {
            mean,
            scale,
            samples_seen: 0,
        })
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Column means
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Column scales
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Rows seen during fit
    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    fn check_width(&self, actual: usize) -> Result<(), EncodingError> {
        if actual != self.n_features() {
            return Err(EncodingError::DimensionMismatch {
                expected: self.n_features(),
                actual,
            });
        }
        Ok(())
    }

    /// Scale a matrix, returning a new one
    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>, EncodingError> {
        let mut out = data.to_owned();
        self.transform_inplace(&mut out)?;
        Ok(out)
    }

    /// Scale a matrix in place
    pub fn transform_inplace(&self, data: &mut Array2<f64>) -> Result<(), EncodingError> {
        self.check_width(data.ncols())?;
        for mut row in data.rows_mut() {
            for ((v, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *v = (*v - m) / s;
            }
        }
        Ok(())
    }

    /// Scale a single encoded row
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Result<Array1<f64>, EncodingError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }
}
