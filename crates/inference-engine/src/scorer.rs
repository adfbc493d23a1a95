//! Fraud Scorer
//!
//! Application context built once at startup from the artifact store and
//! shared read-only across requests.

use crate::engine::{EnsemblePrediction, EnsemblePredictor};
use crate::InferenceError;
use boosting::Classifier;
use feature_engine::{FeatureEncoder, FeatureManifest, StandardScaler, TransactionRecord};
use storage::ArtifactStore;
use tracing::info;

/// Manifest encoder, frozen scaler and both classifiers
pub struct FraudScorer {
    encoder: FeatureEncoder,
    scaler: StandardScaler,
    ensemble: EnsemblePredictor,
}

impl FraudScorer {
    /// Assemble a scorer, checking every artifact agrees on the feature width
    pub fn new(
        manifest: FeatureManifest,
        scaler: StandardScaler,
        gbt: Box<dyn Classifier>,
        oblivious: Box<dyn Classifier>,
    ) -> Result<Self, InferenceError> {
        let expected = manifest.len();
        if scaler.n_features() != expected {
            return Err(InferenceError::FeatureMismatch {
                component: "scaler",
                expected,
                actual: scaler.n_features(),
            });
        }
        for (component, model) in [("gbt model", &gbt), ("oblivious model", &oblivious)] {
            if model.n_features() != expected {
                return Err(InferenceError::FeatureMismatch {
                    component,
                    expected,
                    actual: model.n_features(),
                });
            }
        }

        Ok(Self {
            encoder: FeatureEncoder::new(manifest),
            scaler,
            ensemble: EnsemblePredictor::new(gbt, oblivious)?,
        })
    }

    /// Load all four artifacts from a models directory
    pub fn from_store(store: &ArtifactStore) -> Result<Self, InferenceError> {
        info!("Loading model artifacts from {}", store.root().display());
        let manifest = store.load_manifest()?;
        let scaler = store.load_scaler()?;
        let gbt = store.load_gbt()?;
        let oblivious = store.load_oblivious()?;

        let scorer = Self::new(manifest, scaler, Box::new(gbt), Box::new(oblivious))?;
        info!("Fraud scorer ready: {} features", scorer.feature_count());
        Ok(scorer)
    }

    /// Width of the manifest every request is encoded against
    pub fn feature_count(&self) -> usize {
        self.encoder.feature_count()
    }

    pub fn manifest(&self) -> &FeatureManifest {
        self.encoder.manifest()
    }

    /// Encode, scale and score one transaction
    pub fn score(&self, record: &TransactionRecord) -> Result<EnsemblePrediction, InferenceError> {
        let encoded = self.encoder.encode(record);
        let scaled = self.scaler.transform_row(encoded.view())?;
        self.ensemble.predict(scaled.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boosting::{GbtParams, GradientBoostedTrees, ObliviousBoosting, ObliviousParams};
    use feature_engine::CategoryVocabulary;
    use ndarray::Array1;
    use tempfile::tempdir;

    fn record(amount: f64, merchant: &str, category: &str) -> TransactionRecord {
        TransactionRecord {
            amount,
            lat: 40.7,
            long: -74.0,
            city_pop: 10_000,
            merch_lat: 40.8,
            merch_long: -73.9,
            merchant: merchant.to_string(),
            category: category.to_string(),
            gender: "F".to_string(),
            job: "Nurse".to_string(),
        }
    }

    /// Small trained artifact set where large amounts are fraud
    fn artifacts() -> (FeatureManifest, StandardScaler, GradientBoostedTrees, ObliviousBoosting) {
        let records: Vec<TransactionRecord> = (0..120)
            .map(|i| {
                let merchant = if i % 2 == 0 { "Amazon" } else { "Walmart" };
                let category = if i % 3 == 0 { "grocery" } else { "travel" };
                record(i as f64 * 10.0, merchant, category)
            })
            .collect();
        let labels = Array1::from_shape_fn(records.len(), |i| if i >= 80 { 1.0 } else { 0.0 });

        let mut vocabulary = CategoryVocabulary::new();
        vocabulary.observe_all(&records);
        let manifest = vocabulary.to_manifest().unwrap();
        let encoder = FeatureEncoder::new(manifest.clone());
        let raw = encoder.encode_batch(&records);
        let scaler = StandardScaler::fit(raw.view()).unwrap();
        let x = scaler.transform(raw.view()).unwrap();

        let mut gbt = GradientBoostedTrees::new(GbtParams {
            n_estimators: 20,
            scale_pos_weight: 1.0,
            ..Default::default()
        });
        gbt.fit(x.view(), labels.view(), None).unwrap();
        let mut oblivious = ObliviousBoosting::new(ObliviousParams {
            iterations: 20,
            class_weights: [1.0, 1.0],
            ..Default::default()
        });
        oblivious.fit(x.view(), labels.view(), None).unwrap();

        (manifest, scaler, gbt, oblivious)
    }

    fn scorer() -> FraudScorer {
        let (manifest, scaler, gbt, oblivious) = artifacts();
        FraudScorer::new(manifest, scaler, Box::new(gbt), Box::new(oblivious)).unwrap()
    }

    #[test]
    fn test_scores_known_pattern() {
        let scorer = scorer();
        let low = scorer.score(&record(50.0, "Amazon", "grocery")).unwrap();
        let high = scorer.score(&record(1150.0, "Amazon", "grocery")).unwrap();
        assert!(low.prediction < high.prediction);
        assert!(!low.is_fraud);
        assert!(high.is_fraud);
    }

    #[test]
    fn test_unseen_categories_still_score() {
        let scorer = scorer();
        let mut unseen = record(500.0, "Brand New Shop", "crypto");
        unseen.gender = "X".to_string();
        unseen.job = "Astronaut".to_string();

        let result = scorer.score(&unseen).unwrap();
        assert!((0.0..=1.0).contains(&result.prediction));
        assert!(
            (result.prediction - (result.gbt_prediction + result.oblivious_prediction) / 2.0).abs()
                < 1e-12
        );
    }

    #[test]
    fn test_scaler_width_mismatch_fails() {
        let (manifest, _, gbt, oblivious) = artifacts();
        let scaler = StandardScaler::from_parts(vec![0.0; 3], vec![1.0; 3]).unwrap();
        let result = FraudScorer::new(manifest, scaler, Box::new(gbt), Box::new(oblivious));
        assert!(matches!(
            result,
            Err(InferenceError::FeatureMismatch { component: "scaler", actual: 3, .. })
        ));
    }

    #[test]
    fn test_model_width_mismatch_fails() {
        let (_, _, gbt, oblivious) = artifacts();
        let manifest = FeatureManifest::new(vec!["amt".to_string(), "lat".to_string()]).unwrap();
        let scaler = StandardScaler::from_parts(vec![0.0; 2], vec![1.0; 2]).unwrap();
        let result = FraudScorer::new(manifest, scaler, Box::new(gbt), Box::new(oblivious));
        assert!(matches!(
            result,
            Err(InferenceError::FeatureMismatch { component: "gbt model", expected: 2, .. })
        ));
    }

    #[test]
    fn test_from_store() {
        let (manifest, scaler, gbt, oblivious) = artifacts();
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save_manifest(&manifest).unwrap();
        store.save_scaler(&scaler).unwrap();
        store.save_model(&gbt).unwrap();
        store.save_model(&oblivious).unwrap();

        let in_memory =
            FraudScorer::new(manifest, scaler, Box::new(gbt), Box::new(oblivious)).unwrap();
        let loaded = FraudScorer::from_store(&store).unwrap();
        let probe = record(730.0, "Walmart", "travel");
        assert_eq!(loaded.score(&probe).unwrap(), in_memory.score(&probe).unwrap());
        assert_eq!(loaded.feature_count(), in_memory.feature_count());
    }

    #[test]
    fn test_missing_artifacts_fail_load() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            FraudScorer::from_store(&store),
            Err(InferenceError::ArtifactLoad(_))
        ));
    }
}
