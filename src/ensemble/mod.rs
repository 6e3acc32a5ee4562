//! Ensemble inference
//!
//! - `predictor`: runs the registry slots for one vector
//! - `fallback`: rule-based score when nothing is loaded
//! - `outcome`: response shape and risk labels

pub mod fallback;
pub mod outcome;
pub mod predictor;

pub use fallback::{FallbackBreakdown, FallbackRiskScorer};
pub use outcome::{
    EnsembleOutcome, LabelScheme, OutcomeAssembler, OutcomeDiagnostics, OutcomeSource, RiskLabel,
    SlotPrediction, StackedPrediction,
};
pub use predictor::EnsemblePredictor;
