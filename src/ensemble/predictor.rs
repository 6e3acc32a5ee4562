//! Ensemble inference over the registry
//!
//! Runs every loaded base model, absorbs per-slot failures, consults the
//! stacking model when any base model answered, and falls back to rule-based
//! scoring when none did.

use crate::ensemble::fallback::FallbackRiskScorer;
use crate::ensemble::outcome::{EnsembleOutcome, LabelScheme, OutcomeAssembler, SlotPrediction};
use crate::errors::{PredictionError, Result, ServiceError};
use crate::features::FeatureVector;
use crate::models::predictor::checked_probability;
use crate::models::{ModelRegistry, SlotId};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Combines registry slots into one outcome per request
pub struct EnsemblePredictor {
    registry: Arc<ModelRegistry>,
    scorer: FallbackRiskScorer,
    assembler: OutcomeAssembler,
}

impl EnsemblePredictor {
    pub fn new(registry: Arc<ModelRegistry>, scheme: LabelScheme) -> Self {
        Self {
            registry,
            scorer: FallbackRiskScorer::new(),
            assembler: OutcomeAssembler::new(scheme),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn label_scheme(&self) -> LabelScheme {
        self.assembler.scheme()
    }

    /// Predict for one vector
    ///
    /// Only a schema mismatch is an error; any other failure degrades to
    /// averaging or fallback scoring.
    pub fn predict(&self, features: &FeatureVector) -> Result<EnsembleOutcome> {
        let expected = self.registry.schema();
        if features.schema() != expected {
            return Err(ServiceError::Schema(PredictionError::SchemaMismatch {
                expected: expected.to_string(),
                found: features.schema().to_string(),
            }));
        }

        let mut predictions = Vec::with_capacity(SlotId::BASE.len());
        for slot in SlotId::BASE {
            let probability = self.invoke(slot, features)?;
            predictions.push(SlotPrediction { slot, probability });
        }

        let valid: Vec<f64> = predictions.iter().filter_map(|p| p.probability).collect();
        if valid.is_empty() {
            let score = self.scorer.score(features);
            debug!(score, "No base model available, using fallback score");
            return Ok(self.assembler.from_fallback(score));
        }

        let average = valid.iter().sum::<f64>() / valid.len() as f64;
        let stacked = self.invoke(SlotId::Stacking, features)?;
        if stacked.is_none() {
            debug!(average, "Stacking unavailable, using base average");
        }

        let outcome = self.assembler.from_ensemble(&predictions, average, stacked);
        if !outcome.diagnostics.backfilled.is_empty() {
            warn!(
                slots = ?outcome.diagnostics.backfilled,
                average,
                "Backfilled unavailable base predictions with ensemble average"
            );
        }
        Ok(outcome)
    }

    /// Probability from one slot, `None` if it is unusable for this request
    fn invoke(&self, slot: SlotId, features: &FeatureVector) -> Result<Option<f64>> {
        let predictor = match self.registry.slot(slot).predictor() {
            Some(predictor) => predictor,
            None => return Ok(None),
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            predictor.predict_probability(features)
        }))
        .unwrap_or_else(|payload| Err(PredictionError::Invocation(panic_message(&*payload))));

        match result.and_then(checked_probability) {
            Ok(p) => Ok(Some(p)),
            Err(e) if e.is_fatal() => Err(ServiceError::Schema(e)),
            Err(e) => {
                warn!(slot = %slot, error = %e, "Model prediction failed");
                Ok(None)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
