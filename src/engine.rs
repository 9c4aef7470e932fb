//! # Prediction Engine
//! Pure, testable logic that maps a raw sample → rated prediction.
//! No I/O; artifacts arrive already loaded, suitable for unit tests and
//! offline evaluation.
//!
//! Pipeline: build the ordered feature row, log-condition the five skewed
//! columns, scale, infer, round, classify.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::artifacts::Artifacts;
use crate::classify::{classify, Rating};
use crate::features::{FeatureVector, RawSample};

/// Inference failed for this submission. Terminal for the request; the
/// form stays usable for a retry.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("model produced a non-finite score")]
    NonFinite,
}

/// A scored submission: the continuous model output plus its rating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub raw_score: f64,
    pub rating: Rating,
}

#[derive(Clone)]
pub struct PredictionEngine {
    artifacts: Arc<Artifacts>,
}

impl PredictionEngine {
    pub fn new(artifacts: Arc<Artifacts>) -> Self {
        Self { artifacts }
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn predict(&self, raw: &RawSample) -> Result<Prediction, PredictError> {
        let conditioned = FeatureVector::from_raw(raw).log_conditioned();
        let scaled = self.artifacts.scaler.transform(&conditioned);
        let raw_score = self.artifacts.model.predict(&scaled);
        if !raw_score.is_finite() {
            return Err(PredictError::NonFinite);
        }

        let rating = classify(raw_score);
        if !(0..=10).contains(&rating.score) {
            warn!(score = rating.score, "model score outside the 0-10 display range");
        }
        debug!(raw_score, score = rating.score, tier = rating.tier.as_str(), "sample rated");

        Ok(Prediction { raw_score, rating })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ModelArtifact, ScalerArtifact};
    use crate::classify::Tier;

    /// Identity scaler + a model reading only the alcohol column.
    fn alcohol_engine(weight: f64) -> PredictionEngine {
        let scaler = ScalerArtifact::Standard {
            mean: vec![0.0; 11],
            scale: vec![1.0; 11],
        };
        let mut coefficients = vec![0.0; 11];
        coefficients[10] = weight;
        let model = ModelArtifact::Linear {
            intercept: 0.0,
            coefficients,
        };
        PredictionEngine::new(Arc::new(Artifacts {
            scaler,
            model,
            scaler_fingerprint: "test".into(),
            model_fingerprint: "test".into(),
        }))
    }

    #[test]
    fn defaults_rate_as_a_standard_selection() {
        // Alcohol is not log-conditioned, so 0.5 * 11.5 = 5.75 exactly.
        let p = alcohol_engine(0.5).predict(&RawSample::default()).unwrap();
        assert_eq!(p.raw_score, 5.75);
        assert_eq!(p.rating, Rating { score: 6, tier: Tier::Mid });
    }

    #[test]
    fn conditioning_reaches_the_model() {
        // A model reading only residual sugar sees ln(0.6 + 1), not 0.6.
        let scaler = ScalerArtifact::Standard {
            mean: vec![0.0; 11],
            scale: vec![1.0; 11],
        };
        let mut coefficients = vec![0.0; 11];
        coefficients[3] = 1.0;
        let model = ModelArtifact::Linear {
            intercept: 0.0,
            coefficients,
        };
        let engine = PredictionEngine::new(Arc::new(Artifacts {
            scaler,
            model,
            scaler_fingerprint: "test".into(),
            model_fingerprint: "test".into(),
        }));

        let p = engine.predict(&RawSample::default()).unwrap();
        assert_eq!(p.raw_score, 0.6_f64.ln_1p());
    }

    #[test]
    fn non_finite_output_is_a_prediction_failure() {
        // An overflowing coefficient drives the dot product to infinity.
        let p = alcohol_engine(f64::MAX).predict(&RawSample::default());
        assert!(matches!(p, Err(PredictError::NonFinite)));
    }

    #[test]
    fn out_of_range_scores_still_classify() {
        let p = alcohol_engine(2.0).predict(&RawSample::default()).unwrap();
        assert_eq!(p.rating.score, 23);
        assert_eq!(p.rating.tier, Tier::High);
    }
}
