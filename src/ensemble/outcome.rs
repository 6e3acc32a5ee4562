//! Externally reported prediction shape

use crate::ensemble::fallback::FallbackRiskScorer;
use crate::errors::ServiceError;
use crate::models::SlotId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Categorical risk derived from the stacked probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Moderate,
    High,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Low",
            RiskLabel::Moderate => "Moderate",
            RiskLabel::High => "High",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability → label mapping, fixed per deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelScheme {
    /// `< 0.5` Low, otherwise High
    #[default]
    TwoBand,
    /// `< 0.3` Low, `< 0.6` Moderate, otherwise High
    ThreeBand,
}

impl LabelScheme {
    pub fn label(&self, probability: f64) -> RiskLabel {
        match self {
            LabelScheme::TwoBand => {
                if probability < 0.5 {
                    RiskLabel::Low
                } else {
                    RiskLabel::High
                }
            }
            LabelScheme::ThreeBand => {
                if probability < 0.3 {
                    RiskLabel::Low
                } else if probability < 0.6 {
                    RiskLabel::Moderate
                } else {
                    RiskLabel::High
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelScheme::TwoBand => "two_band",
            LabelScheme::ThreeBand => "three_band",
        }
    }
}

impl FromStr for LabelScheme {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "two_band" => Ok(LabelScheme::TwoBand),
            "three_band" => Ok(LabelScheme::ThreeBand),
            other => Err(ServiceError::ConfigError(format!(
                "Unknown label scheme: {}",
                other
            ))),
        }
    }
}

/// Result of one base slot for one request; `None` when unusable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPrediction {
    pub slot: SlotId,
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StackedPrediction {
    pub probability: f64,
    pub label: RiskLabel,
}

/// Which path produced the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    #[default]
    Ensemble,
    Fallback,
}

/// Request-local bookkeeping, not part of the response body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeDiagnostics {
    pub source: OutcomeSource,
    /// Base slots that were backfilled with the average
    pub backfilled: Vec<SlotId>,
    /// Whether the stacking model produced the stacked probability
    pub stacking_used: bool,
}

/// Uniform result for every request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleOutcome {
    pub base_predictions: BTreeMap<SlotId, f64>,
    pub stacked: StackedPrediction,
    #[serde(skip)]
    pub diagnostics: OutcomeDiagnostics,
}

impl EnsembleOutcome {
    pub fn probability(&self) -> f64 {
        self.stacked.probability
    }

    pub fn label(&self) -> RiskLabel {
        self.stacked.label
    }

    pub fn is_fallback(&self) -> bool {
        self.diagnostics.source == OutcomeSource::Fallback
    }
}

/// Normalizes ensemble or fallback results into an `EnsembleOutcome`
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeAssembler {
    scheme: LabelScheme,
}

impl OutcomeAssembler {
    pub fn new(scheme: LabelScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> LabelScheme {
        self.scheme
    }

    /// Fill unusable base slots with `average`; stacked defaults to `average`
    pub fn from_ensemble(
        &self,
        predictions: &[SlotPrediction],
        average: f64,
        stacked: Option<f64>,
    ) -> EnsembleOutcome {
        let mut backfilled = Vec::new();
        let base_predictions = SlotId::BASE
            .iter()
            .map(|slot| {
                let probability = predictions
                    .iter()
                    .find(|p| p.slot == *slot)
                    .and_then(|p| p.probability);
                match probability {
                    Some(p) => (*slot, p),
                    None => {
                        backfilled.push(*slot);
                        (*slot, average)
                    }
                }
            })
            .collect();

        let probability = stacked.unwrap_or(average);
        EnsembleOutcome {
            base_predictions,
            stacked: self.stacked(probability),
            diagnostics: OutcomeDiagnostics {
                source: OutcomeSource::Ensemble,
                backfilled,
                stacking_used: stacked.is_some(),
            },
        }
    }

    /// Wrap a fallback score; base entries are fixed perturbations of it
    pub fn from_fallback(&self, score: f64) -> EnsembleOutcome {
        EnsembleOutcome {
            base_predictions: FallbackRiskScorer::base_estimates(score),
            stacked: self.stacked(score),
            diagnostics: OutcomeDiagnostics {
                source: OutcomeSource::Fallback,
                backfilled: SlotId::BASE.to_vec(),
                stacking_used: false,
            },
        }
    }

    fn stacked(&self, probability: f64) -> StackedPrediction {
        StackedPrediction {
            probability,
            label: self.scheme.label(probability),
        }
    }
}
