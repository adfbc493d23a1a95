//! Logistic Loss and Evaluation Metrics

use crate::error::BoostingError;
use ndarray::ArrayView1;

const EPS: f64 = 1e-15;

/// Logistic function
pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Mean binary cross-entropy
pub fn log_loss(labels: ArrayView1<f64>, probabilities: &[f64]) -> f64 {
    if probabilities.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(probabilities)
        .map(|(&y, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / probabilities.len() as f64
}

/// Fraction of rows whose thresholded probability matches the label
pub fn accuracy(labels: ArrayView1<f64>, probabilities: ArrayView1<f64>) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = labels
        .iter()
        .zip(probabilities.iter())
        .filter(|&(&y, &p)| (p > 0.5) == (y > 0.5))
        .count();
    correct as f64 / labels.len() as f64
}

/// Weighted logistic-loss gradient and hessian for every row
pub fn gradients(
    labels: ArrayView1<f64>,
    margins: &[f64],
    weights: &[f64],
    grad: &mut [f64],
    hess: &mut [f64],
) {
    for i in 0..margins.len() {
        let p = sigmoid(margins[i]);
        grad[i] = (p - labels[i]) * weights[i];
        hess[i] = (p * (1.0 - p)).max(1e-16) * weights[i];
    }
}

/// Reject label vectors with anything other than 0 and 1
pub fn check_labels(labels: ArrayView1<f64>) -> Result<(), BoostingError> {
    match labels.iter().find(|&&y| y != 0.0 && y != 1.0) {
        Some(&bad) => Err(BoostingError::InvalidLabel(bad)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use proptest::prelude::*;

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }

    #[test]
    fn test_log_loss_perfect_and_uninformed() {
        let y = array![1.0, 0.0];
        assert!(log_loss(y.view(), &[1.0, 0.0]) < 1e-10);
        assert!((log_loss(y.view(), &[0.5, 0.5]) - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_threshold_is_strict() {
        let y = array![1.0, 0.0, 1.0];
        let p = array![0.5, 0.5, 0.9];
        assert!((accuracy(y.view(), p.view()) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_check_labels() {
        assert!(check_labels(array![0.0, 1.0].view()).is_ok());
        assert!(matches!(
            check_labels(array![0.0, 2.0].view()),
            Err(BoostingError::InvalidLabel(v)) if v == 2.0
        ));
    }

    proptest! {
        #[test]
        fn gradients_point_towards_label(
            rows in prop::collection::vec((any::<bool>(), -10.0f64..10.0, 0.1f64..100.0), 1..50)
        ) {
            let labels: Array1<f64> = rows.iter().map(|r| if r.0 { 1.0 } else { 0.0 }).collect();
            let margins: Vec<f64> = rows.iter().map(|r| r.1).collect();
            let weights: Vec<f64> = rows.iter().map(|r| r.2).collect();
            let mut grad = vec![0.0; rows.len()];
            let mut hess = vec![0.0; rows.len()];
            gradients(labels.view(), &margins, &weights, &mut grad, &mut hess);

            for i in 0..rows.len() {
                prop_assert!(hess[i] > 0.0);
                if labels[i] == 1.0 {
                    prop_assert!(grad[i] <= 0.0);
                } else {
                    prop_assert!(grad[i] >= 0.0);
                }
            }
        }

        #[test]
        fn log_loss_non_negative(probs in prop::collection::vec(0.0f64..=1.0, 1..50)) {
            let labels: Array1<f64> = (0..probs.len()).map(|i| (i % 2) as f64).collect();
            prop_assert!(log_loss(labels.view(), &probs) >= 0.0);
        }
    }
}
