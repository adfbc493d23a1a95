//! Oblivious Tree Boosting
//!
//! Every tree is symmetric: level `l` applies one `(feature, threshold)` test
//! to all `2^l` nodes, so a depth-d tree has exactly `2^d` leaves addressed
//! by the bit pattern of its test outcomes. The split for a level is the one
//! maximising the summed gain over all current leaves.

use crate::binning::{BinMapper, BinnedMatrix};
use crate::error::BoostingError;
use crate::loss::{gradients, log_loss, sigmoid};
use crate::tree::{LevelSplit, ObliviousTree};
use crate::{check_training_input, persist, Classifier, EarlyStopping, EvalSet, FitReport, ModelKind};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Hyperparameters for [`ObliviousBoosting`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObliviousParams {
    /// Boosting rounds
    pub iterations: usize,
    pub learning_rate: f64,
    /// Levels per tree
    pub depth: usize,
    /// L2 regularisation on leaf values
    pub l2_leaf_reg: f64,
    /// Row weight for class 0 and class 1
    pub class_weights: [f64; 2],
    /// Histogram bins per feature
    pub max_bins: usize,
    /// Stop after this many rounds without validation improvement
    pub early_stopping_rounds: Option<usize>,
    /// Keep only the trees up to the best validation round
    pub use_best_model: bool,
}

impl Default for ObliviousParams {
    fn default() -> Self {
        Self {
            iterations: 50,
            learning_rate: 0.1,
            depth: 4,
            l2_leaf_reg: 3.0,
            class_weights: [1.0, 100.0],
            max_bins: 254,
            early_stopping_rounds: Some(5),
            use_best_model: true,
        }
    }
}

impl ObliviousParams {
    pub fn validate(&self) -> Result<(), BoostingError> {
        let problem = if self.iterations == 0 {
            Some("iterations must be positive")
        } else if !(self.learning_rate > 0.0) {
            Some("learning_rate must be positive")
        } else if self.depth == 0 || self.depth > 16 {
            Some("depth must be in [1, 16]")
        } else if !(self.l2_leaf_reg > 0.0) {
            Some("l2_leaf_reg must be positive")
        } else if self.class_weights.iter().any(|w| !(*w > 0.0)) {
            Some("class_weights must be positive")
        } else {
            None
        };
        match problem {
            Some(msg) => Err(BoostingError::InvalidParameter(msg.to_string())),
            None => Ok(()),
        }
    }
}

/// Boosted ensemble of oblivious trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObliviousBoosting {
    params: ObliviousParams,
    trees: Vec<ObliviousTree>,
    n_features: usize,
}

impl ObliviousBoosting {
    pub fn new(params: ObliviousParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &ObliviousParams {
        &self.params
    }

    pub fn trees(&self) -> &[ObliviousTree] {
        &self.trees
    }

    fn margin(&self, row: ArrayView1<f64>) -> f64 {
        self.trees.iter().map(|t| t.predict_row(row)).sum()
    }

    /// Grow one tree on the current gradients
    fn grow_tree(
        &self,
        binned: &BinnedMatrix,
        mapper: &BinMapper,
        grad: &[f64],
        hess: &[f64],
    ) -> ObliviousTree {
        let lambda = self.params.l2_leaf_reg;
        let score = |g: f64, h: f64| g * g / (h + lambda);
        let n_rows = binned.n_rows();
        let mut leaf_of = vec![0usize; n_rows];
        let mut levels = Vec::with_capacity(self.params.depth);

        for level in 0..self.params.depth {
            let n_leaves = 1usize << level;
            let mut leaf_totals = vec![(0.0f64, 0.0f64); n_leaves];
            for (r, &leaf) in leaf_of.iter().enumerate() {
                leaf_totals[leaf].0 += grad[r];
                leaf_totals[leaf].1 += hess[r];
            }
            let parent: f64 = leaf_totals.iter().map(|&(g, h)| score(g, h)).sum();

            let mut best: Option<(usize, usize, f64)> = None;
            for feature in 0..binned.n_cols() {
                let n_bins = mapper.n_bins(feature);
                if n_bins < 2 {
                    continue;
                }
                let column = binned.column(feature);
                let mut hist = vec![(0.0f64, 0.0f64); n_leaves * n_bins];
                for (r, &leaf) in leaf_of.iter().enumerate() {
                    let slot = &mut hist[leaf * n_bins + column[r] as usize];
                    slot.0 += grad[r];
                    slot.1 += hess[r];
                }

                // Prefix sums per leaf, scanned border by border
                let mut left = vec![(0.0f64, 0.0f64); n_leaves];
                for bin in 0..n_bins - 1 {
                    let mut total = 0.0;
                    for leaf in 0..n_leaves {
                        let (bg, bh) = hist[leaf * n_bins + bin];
                        left[leaf].0 += bg;
                        left[leaf].1 += bh;
                        let (gl, hl) = left[leaf];
                        let (g, h) = leaf_totals[leaf];
                        total += score(gl, hl) + score(g - gl, h - hl);
                    }
                    let gain = total - parent;
                    if gain.is_finite() && best.map_or(true, |(_, _, b)| gain > b) {
                        best = Some((feature, bin, gain));
                    }
                }
            }

            let Some((feature, bin, gain)) = best else {
                break;
            };
            let column = binned.column(feature);
            for (r, leaf) in leaf_of.iter_mut().enumerate() {
                if column[r] as usize > bin {
                    *leaf |= 1 << level;
                }
            }
            debug!("Level {}: feature {} bin {} gain {:.6}", level, feature, bin, gain);
            levels.push(LevelSplit {
                feature: feature as u32,
                threshold: mapper.threshold(feature, bin),
            });
        }

        let n_leaves = 1usize << levels.len();
        let mut sums = vec![(0.0f64, 0.0f64); n_leaves];
        for (r, &leaf) in leaf_of.iter().enumerate() {
            sums[leaf].0 += grad[r];
            sums[leaf].1 += hess[r];
        }
        let leaves = sums
            .into_iter()
            .map(|(g, h)| -g / (h + lambda) * self.params.learning_rate)
            .collect();

        ObliviousTree { levels, leaves }
    }
}

impl Default for ObliviousBoosting {
    fn default() -> Self {
        Self::new(ObliviousParams::default())
    }
}

impl Classifier for ObliviousBoosting {
    fn kind(&self) -> ModelKind {
        ModelKind::ObliviousBoosting
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        labels: ArrayView1<f64>,
        eval: Option<EvalSet<'_>>,
    ) -> Result<FitReport, BoostingError> {
        check_training_input(&features, &labels, eval.as_ref())?;
        self.params.validate()?;

        let (n_rows, n_cols) = features.dim();
        info!(
            "Training oblivious boosting on {} rows x {} features ({} iterations, depth {})",
            n_rows, n_cols, self.params.iterations, self.params.depth
        );

        let mapper = BinMapper::fit(features, self.params.max_bins)?;
        let binned = mapper.transform(features)?;
        let weights: Vec<f64> = labels
            .iter()
            .map(|&y| self.params.class_weights[usize::from(y > 0.5)])
            .collect();

        self.trees.clear();
        self.n_features = n_cols;

        let mut margins = vec![0.0; n_rows];
        let mut eval_margins = eval.map(|e| vec![0.0; e.features.nrows()]);
        let mut grad = vec![0.0; n_rows];
        let mut hess = vec![0.0; n_rows];
        let mut stopper = EarlyStopping::new(self.params.early_stopping_rounds);
        let mut train_losses = Vec::with_capacity(self.params.iterations);

        let mut rounds_run = 0;
        for round in 0..self.params.iterations {
            gradients(labels, &margins, &weights, &mut grad, &mut hess);
            let tree = self.grow_tree(&binned, &mapper, &grad, &hess);

            for (margin, row) in margins.iter_mut().zip(features.rows()) {
                *margin += tree.predict_row(row);
            }
            let probabilities: Vec<f64> = margins.iter().map(|&m| sigmoid(m)).collect();
            train_losses.push(log_loss(labels, &probabilities));

            let mut stop = false;
            if let (Some(eval), Some(eval_margins)) = (eval.as_ref(), eval_margins.as_mut()) {
                for (margin, row) in eval_margins.iter_mut().zip(eval.features.rows()) {
                    *margin += tree.predict_row(row);
                }
                let eval_probs: Vec<f64> = eval_margins.iter().map(|&m| sigmoid(m)).collect();
                let eval_loss = log_loss(eval.labels, &eval_probs);
                debug!(
                    "Iteration {}: train logloss {:.6}, eval logloss {:.6}",
                    round, train_losses[round], eval_loss
                );
                stop = stopper.update(round, eval_loss);
            } else {
                debug!("Iteration {}: train logloss {:.6}", round, train_losses[round]);
            }

            self.trees.push(tree);
            rounds_run = round + 1;
            if stop {
                info!(
                    "Early stopping at iteration {}, best iteration {}",
                    round,
                    stopper.best_round()
                );
                break;
            }
        }

        let (best_iteration, best_eval_loss) = if eval.is_some() {
            if self.params.use_best_model {
                self.trees.truncate(stopper.best_round() + 1);
            }
            (Some(stopper.best_round()), Some(stopper.best_loss()))
        } else {
            (None, None)
        };

        let report = FitReport {
            rounds_run,
            trees_kept: self.trees.len(),
            best_iteration,
            best_eval_loss,
            train_loss: train_losses[self.trees.len() - 1],
        };
        info!(
            "Oblivious boosting trained: {} trees kept of {} iterations",
            report.trees_kept, report.rounds_run
        );
        Ok(report)
    }

    fn predict_proba_row(&self, row: ArrayView1<f64>) -> Result<f64, BoostingError> {
        if self.n_features == 0 {
            return Err(BoostingError::NotFitted);
        }
        if row.len() != self.n_features {
            return Err(BoostingError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        Ok(sigmoid(self.margin(row)))
    }

    fn save(&self, path: &Path) -> Result<(), BoostingError> {
        if self.n_features == 0 {
            return Err(BoostingError::NotFitted);
        }
        persist::write_model(path, self.kind(), self)
    }

    fn load(path: &Path) -> Result<Self, BoostingError> {
        persist::read_model(path, ModelKind::ObliviousBoosting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use tempfile::tempdir;

    fn separable(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => ((i * 31) % 17) as f64,
            1 => i as f64 / n as f64,
            _ => (i % 2) as f64,
        });
        let y = Array1::from_shape_fn(n, |i| if (i as f64 / n as f64) > 0.5 { 1.0 } else { 0.0 });
        (x, y)
    }

    fn balanced_params() -> ObliviousParams {
        ObliviousParams {
            class_weights: [1.0, 1.0],
            early_stopping_rounds: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_separates_toy_set() {
        let (x, y) = separable(200);
        let mut model = ObliviousBoosting::new(balanced_params());
        let report = model.fit(x.view(), y.view(), None).unwrap();

        assert_eq!(report.trees_kept, 50);
        assert_eq!(model.score(x.view(), y.view()).unwrap(), 1.0);
        for tree in model.trees() {
            assert_eq!(tree.leaves.len(), 1 << tree.depth());
            assert!(tree.depth() <= 4);
        }
    }

    #[test]
    fn test_early_stopping_keeps_best_model() {
        let (x, y) = separable(200);
        let flipped = y.mapv(|v| 1.0 - v);
        let eval = EvalSet {
            features: x.view(),
            labels: flipped.view(),
        };

        let mut model = ObliviousBoosting::new(ObliviousParams {
            early_stopping_rounds: Some(2),
            ..balanced_params()
        });
        let report = model.fit(x.view(), y.view(), Some(eval)).unwrap();
        assert_eq!(report.best_iteration, Some(0));
        assert_eq!(report.rounds_run, 3);
        assert_eq!(report.trees_kept, 1);

        let mut keep_all = ObliviousBoosting::new(ObliviousParams {
            early_stopping_rounds: Some(2),
            use_best_model: false,
            ..balanced_params()
        });
        let report = keep_all.fit(x.view(), y.view(), Some(eval)).unwrap();
        assert_eq!(report.trees_kept, 3);
    }

    #[test]
    fn test_save_load_identical_probabilities() {
        let (x, y) = separable(120);
        let mut model = ObliviousBoosting::default();
        model.fit(x.view(), y.view(), None).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("oblivious_model.bin");
        model.save(&path).unwrap();
        let restored = ObliviousBoosting::load(&path).unwrap();

        assert_eq!(
            restored.predict_proba(x.view()).unwrap(),
            model.predict_proba(x.view()).unwrap()
        );
        assert!(matches!(
            crate::GradientBoostedTrees::load(&path),
            Err(BoostingError::WrongModelKind { .. })
        ));
    }

    #[test]
    fn test_constant_features_give_stump() {
        let x = Array2::from_elem((10, 2), 1.0);
        let y = Array1::from_shape_fn(10, |i| (i % 2) as f64);
        let mut model = ObliviousBoosting::new(balanced_params());
        model.fit(x.view(), y.view(), None).unwrap();

        assert!(model.trees().iter().all(|t| t.depth() == 0 && t.leaves.len() == 1));
        let p = model.predict_proba_row(x.row(0)).unwrap();
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_leaf_regularisation_rejected() {
        let params = ObliviousParams {
            l2_leaf_reg: 0.0,
            ..balanced_params()
        };
        assert!(matches!(params.validate(), Err(BoostingError::InvalidParameter(_))));

        let (x, y) = separable(40);
        let mut model = ObliviousBoosting::new(params);
        assert!(matches!(
            model.fit(x.view(), y.view(), None),
            Err(BoostingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_empty_leaves_stay_finite() {
        // Depth 2 on a single informative feature leaves some leaves empty
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 && i >= 20 { 1.0 } else { 0.0 });
        let y = Array1::from_shape_fn(40, |i| if i >= 20 { 1.0 } else { 0.0 });
        let mut model = ObliviousBoosting::new(ObliviousParams {
            depth: 2,
            iterations: 5,
            l2_leaf_reg: 1e-9,
            ..balanced_params()
        });
        model.fit(x.view(), y.view(), None).unwrap();

        for tree in model.trees() {
            assert!(tree.leaves.iter().all(|v| v.is_finite()));
        }
        assert_eq!(model.score(x.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn test_class_weights_validated() {
        let params = ObliviousParams {
            class_weights: [1.0, 0.0],
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
