//! Gradient Boosting Classifiers
//!
//! Two binary classifiers behind one `Classifier` contract:
//!
//! - [`GradientBoostedTrees`]: depth-wise second-order boosting on histogram
//!   bins with row and column subsampling.
//! - [`ObliviousBoosting`]: symmetric trees where every level shares a single
//!   split.
//!
//! Both optimise logistic loss, support class re-weighting and early stopping
//! on a validation set, and persist themselves as versioned `postcard` files.

mod binning;
mod error;
mod gbt;
mod loss;
mod oblivious;
mod persist;
mod tree;

pub use binning::{BinMapper, BinnedMatrix};
pub use error::BoostingError;
pub use gbt::{GbtParams, GradientBoostedTrees};
pub use loss::{accuracy, log_loss, sigmoid};
pub use oblivious::{ObliviousBoosting, ObliviousParams};
pub use tree::{LevelSplit, Node, ObliviousTree, Tree};

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which boosting algorithm a model uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    GradientBoostedTrees,
    ObliviousBoosting,
}

impl ModelKind {
    /// Short identifier used in file names and API fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::GradientBoostedTrees => "gbt",
            ModelKind::ObliviousBoosting => "oblivious",
        }
    }

    /// Human readable model type
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::GradientBoostedTrees => "Gradient Boosted Trees",
            ModelKind::ObliviousBoosting => "Oblivious Boosting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Held-out data used for early stopping only
#[derive(Debug, Clone, Copy)]
pub struct EvalSet<'a> {
    pub features: ArrayView2<'a, f64>,
    pub labels: ArrayView1<'a, f64>,
}

/// Summary of a `fit` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Boosting rounds actually run
    pub rounds_run: usize,
    /// Trees kept in the final model
    pub trees_kept: usize,
    /// Round with the lowest validation loss, when an eval set was given
    pub best_iteration: Option<usize>,
    /// Validation log loss at `best_iteration`
    pub best_eval_loss: Option<f64>,
    /// Training log loss after the last kept round
    pub train_loss: f64,
}

/// Binary classifier contract shared by both boosting variants
pub trait Classifier: Send + Sync {
    /// Algorithm of this model
    fn kind(&self) -> ModelKind;

    /// Width of the feature rows the model was fitted on (0 before fit)
    fn n_features(&self) -> usize;

    /// Train on `features` / `labels` (labels are 0.0 or 1.0)
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        labels: ArrayView1<f64>,
        eval: Option<EvalSet<'_>>,
    ) -> Result<FitReport, BoostingError>;

    /// Class-1 probability of a single row
    fn predict_proba_row(&self, row: ArrayView1<f64>) -> Result<f64, BoostingError>;

    /// Persist the fitted model
    fn save(&self, path: &Path) -> Result<(), BoostingError>;

    /// Restore a model written by `save`
    fn load(path: &Path) -> Result<Self, BoostingError>
    where
        Self: Sized;

    /// Class-1 probability of every row
    fn predict_proba(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, BoostingError> {
        features
            .rows()
            .into_iter()
            .map(|row| self.predict_proba_row(row))
            .collect()
    }

    /// Accuracy at the 0.5 decision threshold
    fn score(
        &self,
        features: ArrayView2<f64>,
        labels: ArrayView1<f64>,
    ) -> Result<f64, BoostingError> {
        let probabilities = self.predict_proba(features)?;
        Ok(accuracy(labels, probabilities.view()))
    }
}

/// Shared input checks for `fit`
pub(crate) fn check_training_input(
    features: &ArrayView2<f64>,
    labels: &ArrayView1<f64>,
    eval: Option<&EvalSet<'_>>,
) -> Result<(), BoostingError> {
    if features.nrows() == 0 || features.ncols() == 0 {
        return Err(BoostingError::EmptyData);
    }
    if features.nrows() != labels.len() {
        return Err(BoostingError::LabelCountMismatch {
            rows: features.nrows(),
            labels: labels.len(),
        });
    }
    loss::check_labels(labels.view())?;

    if let Some(eval) = eval {
        if eval.features.ncols() != features.ncols() {
            return Err(BoostingError::DimensionMismatch {
                expected: features.ncols(),
                actual: eval.features.ncols(),
            });
        }
        if eval.features.nrows() != eval.labels.len() {
            return Err(BoostingError::LabelCountMismatch {
                rows: eval.features.nrows(),
                labels: eval.labels.len(),
            });
        }
        loss::check_labels(eval.labels.view())?;
    }
    Ok(())
}

/// Tracks validation loss across rounds and decides when to stop
#[derive(Debug, Clone)]
pub(crate) struct EarlyStopping {
    patience: Option<usize>,
    best_round: usize,
    best_loss: f64,
}

impl EarlyStopping {
    pub(crate) fn new(patience: Option<usize>) -> Self {
        Self {
            patience,
            best_round: 0,
            best_loss: f64::INFINITY,
        }
    }

    /// Record a round's validation loss; returns true when training should stop
    pub(crate) fn update(&mut self, round: usize, loss: f64) -> bool {
        if loss < self.best_loss {
            self.best_loss = loss;
            self.best_round = round;
        }
        match self.patience {
            Some(patience) => round - self.best_round >= patience,
            None => false,
        }
    }

    pub(crate) fn best_round(&self) -> usize {
        self.best_round
    }

    pub(crate) fn best_loss(&self) -> f64 {
        self.best_loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_early_stopping_patience() {
        let mut stopper = EarlyStopping::new(Some(2));
        assert!(!stopper.update(0, 0.5));
        assert!(!stopper.update(1, 0.4));
        assert!(!stopper.update(2, 0.45));
        assert!(stopper.update(3, 0.41));
        assert_eq!(stopper.best_round(), 1);
        assert_eq!(stopper.best_loss(), 0.4);
    }

    #[test]
    fn test_early_stopping_disabled() {
        let mut stopper = EarlyStopping::new(None);
        for round in 0..10 {
            assert!(!stopper.update(round, 1.0 + round as f64));
        }
        assert_eq!(stopper.best_round(), 0);
    }

    #[test]
    fn test_model_kind_names() {
        assert_eq!(ModelKind::GradientBoostedTrees.as_str(), "gbt");
        assert_eq!(ModelKind::ObliviousBoosting.display_name(), "Oblivious Boosting");
    }
}
