//! Probability-prediction contract shared by every loaded model

use crate::errors::PredictionError;
use crate::features::FeatureVector;

/// A model that scores the positive (cardiovascular disease) class
///
/// Implementations are immutable once constructed and are shared across
/// concurrent requests without locking.
pub trait Predictor: Send + Sync {
    /// Positive-class probability for one vector
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, PredictionError>;

    /// Short model family tag for logs and diagnostics
    fn kind(&self) -> &str;
}

/// Reject outputs that are not probabilities
pub fn checked_probability(value: f64) -> Result<f64, PredictionError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PredictionError::InvalidOutput(value))
    }
}

/// Numerically stable logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
