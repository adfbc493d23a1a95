//! Histogram Binning
//!
//! Each feature is cut at up to `max_bins - 1` quantile borders. A value `v`
//! falls in bin `k` where `k` is the first border with `v <= border[k]`;
//! values above every border land in the last bin. A split "bin <= k" is
//! therefore the same as "value <= border[k]", so trained trees carry raw
//! thresholds and scoring never needs the bin mapper.

use crate::error::BoostingError;
use ndarray::ArrayView2;
use tracing::debug;

/// Per-feature quantile borders
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    borders: Vec<Vec<f64>>,
}

/// Feature matrix replaced by bin indices, stored column-major
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    bins: Vec<u8>,
    n_rows: usize,
    n_cols: usize,
}

impl BinMapper {
    /// Largest supported bin count (bins are stored as `u8`)
    pub const MAX_BINS: usize = 256;

    /// Compute borders for every column of `data`
    pub fn fit(data: ArrayView2<f64>, max_bins: usize) -> Result<Self, BoostingError> {
        if !(2..=Self::MAX_BINS).contains(&max_bins) {
            return Err(BoostingError::InvalidParameter(format!(
                "max_bins must be in [2, {}], got {}",
                Self::MAX_BINS,
                max_bins
            )));
        }
        if data.nrows() == 0 {
            return Err(BoostingError::EmptyData);
        }

        let borders: Vec<Vec<f64>> = data
            .columns()
            .into_iter()
            .map(|column| Self::column_borders(column.iter().copied(), max_bins))
            .collect();

        debug!(
            "Binned {} features, {} borders in total",
            borders.len(),
            borders.iter().map(Vec::len).sum::<usize>()
        );

        Ok(Self { borders })
    }

    fn column_borders(values: impl Iterator<Item = f64>, max_bins: usize) -> Vec<f64> {
        let mut sorted: Vec<f64> = values.filter(|v| v.is_finite()).collect();
        sorted.sort_unstable_by(f64::total_cmp);
        let n = sorted.len();

        let mut unique = sorted.clone();
        unique.dedup();
        if unique.len() <= max_bins {
            // Every distinct value gets its own bin; the largest needs no border.
            unique.pop();
            return unique;
        }

        let mut borders: Vec<f64> = (1..max_bins)
            .map(|i| sorted[(i * n / max_bins).min(n - 1)])
            .collect();
        borders.dedup();
        if borders.last() == sorted.last() {
            borders.pop();
        }
        borders
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.borders.len()
    }

    /// Number of bins for a feature
    pub fn n_bins(&self, feature: usize) -> usize {
        self.borders[feature].len() + 1
    }

    /// Raw threshold for the split "bin <= k"
    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.borders[feature][bin]
    }

    /// Bin index of a value
    pub fn bin_of(&self, feature: usize, value: f64) -> u8 {
        self.borders[feature].partition_point(|&border| border < value) as u8
    }

    /// Map a whole matrix to bin indices
    pub fn transform(&self, data: ArrayView2<f64>) -> Result<BinnedMatrix, BoostingError> {
        if data.ncols() != self.n_features() {
            return Err(BoostingError::DimensionMismatch {
                expected: self.n_features(),
                actual: data.ncols(),
            });
        }

        let n_rows = data.nrows();
        let mut bins = Vec::with_capacity(n_rows * self.n_features());
        for (feature, column) in data.columns().into_iter().enumerate() {
            bins.extend(column.iter().map(|&v| self.bin_of(feature, v)));
        }

        Ok(BinnedMatrix {
            bins,
            n_rows,
            n_cols: self.n_features(),
        })
    }
}

impl BinnedMatrix {
    /// Bin indices of one feature, one per row
    pub fn column(&self, feature: usize) -> &[u8] {
        let start = feature * self.n_rows;
        &self.bins[start..start + self.n_rows]
    }

    /// Bin of one cell
    pub fn get(&self, row: usize, feature: usize) -> u8 {
        self.bins[feature * self.n_rows + row]
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }
}
