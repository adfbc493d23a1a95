//! Histogram Gradient Boosted Trees
//!
//! Second-order boosting of depth-wise regression trees. Each round fits a
//! tree to the weighted logistic gradients on a row subsample, scanning
//! per-feature histograms over a column subsample for the best split.

use crate::binning::{BinMapper, BinnedMatrix};
use crate::error::BoostingError;
use crate::loss::{gradients, log_loss, sigmoid};
use crate::tree::{Node, Tree};
use crate::{check_training_input, persist, Classifier, EarlyStopping, EvalSet, FitReport, ModelKind};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Minimum loss reduction accepted for a split
const MIN_SPLIT_GAIN: f64 = 1e-10;

/// Hyperparameters for [`GradientBoostedTrees`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbtParams {
    /// Boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf value
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum hessian sum in each child of a split
    pub min_child_weight: f64,
    /// Fraction of rows sampled per tree
    pub subsample: f64,
    /// Fraction of features sampled per tree
    pub colsample_bytree: f64,
    /// L2 regularisation on leaf values
    pub reg_lambda: f64,
    /// Minimum gain required to split
    pub gamma: f64,
    /// Weight of positive rows relative to negative ones
    pub scale_pos_weight: f64,
    /// Histogram bins per feature
    pub max_bins: usize,
    /// Stop after this many rounds without validation improvement
    pub early_stopping_rounds: Option<usize>,
    pub seed: u64,
}

impl Default for GbtParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 0.1,
            max_depth: 4,
            min_child_weight: 3.0,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            gamma: 0.0,
            scale_pos_weight: 100.0,
            max_bins: 256,
            early_stopping_rounds: Some(5),
            seed: 42,
        }
    }
}

impl GbtParams {
    pub fn validate(&self) -> Result<(), BoostingError> {
        let fraction_ok = |v: f64| v > 0.0 && v <= 1.0;
        let problem = if self.n_estimators == 0 {
            Some("n_estimators must be positive")
        } else if !(self.learning_rate > 0.0) {
            Some("learning_rate must be positive")
        } else if self.max_depth == 0 || self.max_depth > 16 {
            Some("max_depth must be in [1, 16]")
        } else if !fraction_ok(self.subsample) {
            Some("subsample must be in (0, 1]")
        } else if !fraction_ok(self.colsample_bytree) {
            Some("colsample_bytree must be in (0, 1]")
        } else if !(self.reg_lambda > 0.0) {
            Some("reg_lambda must be positive")
        } else if self.min_child_weight < 0.0 || self.gamma < 0.0 {
            Some("min_child_weight and gamma must be non-negative")
        } else if !(self.scale_pos_weight > 0.0) {
            Some("scale_pos_weight must be positive")
        } else {
            None
        };
        match problem {
            Some(msg) => Err(BoostingError::InvalidParameter(msg.to_string())),
            None => Ok(()),
        }
    }
}

/// Gradient boosted decision tree classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: GbtParams,
    base_margin: f64,
    trees: Vec<Tree>,
    n_features: usize,
}

impl GradientBoostedTrees {
    pub fn new(params: GbtParams) -> Self {
        Self {
            params,
            base_margin: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &GbtParams {
        &self.params
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Raw log-odds for one row
    fn margin(&self, row: ArrayView1<f64>) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}

impl Default for GradientBoostedTrees {
    fn default() -> Self {
        Self::new(GbtParams::default())
    }
}

impl Classifier for GradientBoostedTrees {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoostedTrees
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

        let params = self.params.clone();
        let (n_rows, n_cols) = features.dim();
        info!(
            "Training gradient boosted trees on {} rows x {} features ({} rounds, depth {})",
            n_rows, n_cols, params.n_estimators, params.max_depth
        );

        let mapper = BinMapper::fit(features, params.max_bins)?;
        let binned = mapper.transform(features)?;

        let weights: Vec<f64> = labels
            .iter()
            .map(|&y| if y > 0.5 { params.scale_pos_weight } else { 1.0 })
            .collect();
        let positive: f64 = labels.iter().zip(&weights).map(|(&y, &w)| y * w).sum();
        let total: f64 = weights.iter().sum();
        let prior = (positive / total).clamp(1e-6, 1.0 - 1e-6);
        self.base_margin = (prior / (1.0 - prior)).ln();
        self.trees.clear();
        self.n_features = n_cols;

        let mut margins = vec![self.base_margin; n_rows];
        let mut eval_margins = eval.map(|e| vec![self.base_margin; e.features.nrows()]);
        let mut grad = vec![0.0; n_rows];
        let mut hess = vec![0.0; n_rows];
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut stopper = EarlyStopping::new(params.early_stopping_rounds);
        let mut train_losses = Vec::with_capacity(params.n_estimators);

        let row_count = ((n_rows as f64 * params.subsample).round() as usize).clamp(1, n_rows);
        let col_count = ((n_cols as f64 * params.colsample_bytree).round() as usize).clamp(1, n_cols);

        let mut rounds_run = 0;
        for round in 0..params.n_estimators {
            gradients(labels, &margins, &weights, &mut grad, &mut hess);

            let rows: Vec<u32> = if row_count < n_rows {
                sample(&mut rng, n_rows, row_count)
                    .into_iter()
                    .map(|i| i as u32)
                    .collect()
            } else {
                (0..n_rows as u32).collect()
            };
            let mut cols: Vec<usize> = if col_count < n_cols {
                sample(&mut rng, n_cols, col_count).into_vec()
            } else {
                (0..n_cols).collect()
            };
            cols.sort_unstable();

            let builder = TreeBuilder {
                binned: &binned,
                mapper: &mapper,
                grad: &grad,
                hess: &hess,
                params: &params,
            };
            let tree = builder.build(rows, &cols);

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
                    "Round {}: {} leaves, train logloss {:.6}, eval logloss {:.6}",
                    round,
                    tree.leaf_count(),
                    train_losses[round],
                    eval_loss
                );
                stop = stopper.update(round, eval_loss);
            } else {
                debug!(
                    "Round {}: {} leaves, train logloss {:.6}",
                    round,
                    tree.leaf_count(),
                    train_losses[round]
                );
            }

            self.trees.push(tree);
            rounds_run = round + 1;
            if stop {
                info!(
                    "Early stopping at round {}, best round {}",
                    round,
                    stopper.best_round()
                );
                break;
            }
        }

        let (best_iteration, best_eval_loss) = if eval.is_some() {
            self.trees.truncate(stopper.best_round() + 1);
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
            "Gradient boosted trees trained: {} trees kept of {} rounds",
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
        persist::read_model(path, ModelKind::GradientBoostedTrees)
    }
}

/// Best split found for one node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: u8,
    gain: f64,
}

/// Grows one tree level by level from histogram statistics
struct TreeBuilder<'a> {
    binned: &'a BinnedMatrix,
    mapper: &'a BinMapper,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a GbtParams,
}

impl TreeBuilder<'_> {
    fn build(&self, rows: Vec<u32>, features: &[usize]) -> Tree {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut frontier = vec![(0usize, rows)];

        for depth in 0..=self.params.max_depth {
            let mut next = Vec::new();
            for (node_idx, rows) in frontier {
                let (g, h) = self.sums(&rows);
                let split = if depth < self.params.max_depth && rows.len() > 1 {
                    self.best_split(&rows, features, g, h)
                } else {
                    None
                };

                match split {
                    Some(split) => {
                        let column = self.binned.column(split.feature);
                        let (left_rows, right_rows): (Vec<u32>, Vec<u32>) = rows
                            .into_iter()
                            .partition(|&r| column[r as usize] <= split.bin);
                        let left = nodes.len();
                        let right = left + 1;
                        nodes.push(Node::Leaf { value: 0.0 });
                        nodes.push(Node::Leaf { value: 0.0 });
                        nodes[node_idx] = Node::Split {
                            feature: split.feature as u32,
                            threshold: self.mapper.threshold(split.feature, split.bin as usize),
                            left: left as u32,
                            right: right as u32,
                        };
                        next.push((left, left_rows));
                        next.push((right, right_rows));
                    }
                    None => {
                        nodes[node_idx] = Node::Leaf {
                            value: -g / (h + self.params.reg_lambda) * self.params.learning_rate,
                        };
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        Tree { nodes }
    }

    fn sums(&self, rows: &[u32]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &r| {
            (g + self.grad[r as usize], h + self.hess[r as usize])
        })
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    fn best_split(&self, rows: &[u32], features: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let parent = self.score(g, h);
        let mut best: Option<SplitCandidate> = None;

        for &feature in features {
            let n_bins = self.mapper.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let column = self.binned.column(feature);
            let mut hist = vec![(0.0f64, 0.0f64); n_bins];
            for &r in rows {
                let slot = &mut hist[column[r as usize] as usize];
                slot.0 += self.grad[r as usize];
                slot.1 += self.hess[r as usize];
            }

            let (mut gl, mut hl) = (0.0, 0.0);
            for (bin, &(bg, bh)) in hist.iter().enumerate().take(n_bins - 1) {
                gl += bg;
                hl += bh;
                let (gr, hr) = (g - gl, h - hl);
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }
                let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent) - self.params.gamma;
                let better = best.map_or(true, |b| gain > b.gain);
                if gain.is_finite() && gain > MIN_SPLIT_GAIN && better {
                    best = Some(SplitCandidate {
                        feature,
                        bin: bin as u8,
                        gain,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use tempfile::tempdir;

    /// Two features, label decided by the first one
    fn separable(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                i as f64 / n as f64
            } else {
                ((i * 7919) % 101) as f64
            }
        });
        let y = Array1::from_shape_fn(n, |i| if (i as f64 / n as f64) > 0.5 { 1.0 } else { 0.0 });
        (x, y)
    }

    fn balanced_params() -> GbtParams {
        GbtParams {
            scale_pos_weight: 1.0,
            early_stopping_rounds: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_separates_toy_set() {
        let (x, y) = separable(200);
        let mut model = GradientBoostedTrees::new(balanced_params());
        let report = model.fit(x.view(), y.view(), None).unwrap();

        assert_eq!(report.rounds_run, 50);
        assert_eq!(report.trees_kept, 50);
        assert!(report.best_iteration.is_none());
        assert_eq!(model.score(x.view(), y.view()).unwrap(), 1.0);
        assert!(model.trees().iter().all(|t| t.depth() <= 4));
    }

    #[test]
    fn test_early_stopping_truncates_to_best_round() {
        let (x, y) = separable(200);
        let flipped = y.mapv(|v| 1.0 - v);
        let mut model = GradientBoostedTrees::new(GbtParams {
            early_stopping_rounds: Some(3),
            ..balanced_params()
        });
        let eval = EvalSet {
            features: x.view(),
            labels: flipped.view(),
        };
        let report = model.fit(x.view(), y.view(), Some(eval)).unwrap();

        assert_eq!(report.best_iteration, Some(0));
        assert_eq!(report.rounds_run, 4);
        assert_eq!(report.trees_kept, 1);
        assert_eq!(model.trees().len(), 1);
    }

    #[test]
    fn test_save_load_identical_probabilities() {
        let (x, y) = separable(150);
        let mut model = GradientBoostedTrees::default();
        model.fit(x.view(), y.view(), None).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("gbt_model.bin");
        model.save(&path).unwrap();
        let restored = GradientBoostedTrees::load(&path).unwrap();

        assert_eq!(restored, model);
        assert_eq!(
            restored.predict_proba(x.view()).unwrap(),
            model.predict_proba(x.view()).unwrap()
        );
    }

    #[test]
    fn test_positive_weight_shifts_base_margin() {
        let (x, y) = separable(200);
        let mut plain = GradientBoostedTrees::new(balanced_params());
        plain.fit(x.view(), y.view(), None).unwrap();
        let mut weighted = GradientBoostedTrees::new(GbtParams {
            early_stopping_rounds: None,
            ..Default::default()
        });
        weighted.fit(x.view(), y.view(), None).unwrap();

        assert!(plain.base_margin.abs() < 0.1);
        assert!(weighted.base_margin > 4.0);
    }

    #[test]
    fn test_unfitted_and_wrong_width() {
        let model = GradientBoostedTrees::default();
        assert!(matches!(
            model.predict_proba_row(ndarray::array![1.0, 2.0].view()),
            Err(BoostingError::NotFitted)
        ));

        let (x, y) = separable(50);
        let mut model = GradientBoostedTrees::default();
        model.fit(x.view(), y.view(), None).unwrap();
        assert!(matches!(
            model.predict_proba_row(ndarray::array![1.0].view()),
            Err(BoostingError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_rejects_bad_labels() {
        let (x, _) = separable(10);
        let y = Array1::from_elem(10, 2.0);
        let mut model = GradientBoostedTrees::default();
        assert!(matches!(
            model.fit(x.view(), y.view(), None),
            Err(BoostingError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_invalid_params() {
        let params = GbtParams {
            subsample: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        assert!(GbtParams::default().validate().is_ok());
    }

    #[test]
    fn test_zero_lambda_rejected() {
        let params = GbtParams {
            reg_lambda: 0.0,
            ..balanced_params()
        };
        assert!(matches!(params.validate(), Err(BoostingError::InvalidParameter(_))));

        let (x, y) = separable(40);
        let mut model = GradientBoostedTrees::new(params);
        assert!(matches!(
            model.fit(x.view(), y.view(), None),
            Err(BoostingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_small_lambda_leaves_finite() {
        let (x, y) = separable(40);
        let mut model = GradientBoostedTrees::new(GbtParams {
            reg_lambda: 1e-9,
            min_child_weight: 0.0,
            n_estimators: 5,
            ..balanced_params()
        });
        model.fit(x.view(), y.view(), None).unwrap();
        let probabilities = model.predict_proba(x.view()).unwrap();
        assert!(probabilities.iter().all(|p| p.is_finite()));
    }
}
