//! Rule-based risk estimate used when no trained model is usable
//!
//! Points are accumulated in hundredths so band sums stay exact, then
//! clamped to 100 and scaled to a probability.

use crate::features::{Feature, FeatureVector};
use crate::models::SlotId;
use serde::Serialize;
use std::collections::BTreeMap;

const MAX_POINTS: u32 = 100;

/// Per-factor points contributing to a fallback score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FallbackBreakdown {
    pub age: u32,
    pub blood_pressure: u32,
    pub bmi: u32,
    pub cholesterol: u32,
    pub glucose: u32,
    pub lifestyle: u32,
}

impl FallbackBreakdown {
    /// Sum of all factors before clamping
    pub fn raw_total(&self) -> u32 {
        self.age + self.blood_pressure + self.bmi + self.cholesterol + self.glucose + self.lifestyle
    }

    /// Clamped total in hundredths
    pub fn points(&self) -> u32 {
        self.raw_total().min(MAX_POINTS)
    }
}

/// Deterministic scorer over clinical thresholds
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackRiskScorer;

impl FallbackRiskScorer {
    pub fn new() -> Self {
        Self
    }

    /// Probability in [0, 1]; never fails
    pub fn score(&self, features: &FeatureVector) -> f64 {
        self.breakdown(features).points() as f64 / MAX_POINTS as f64
    }

    pub fn breakdown(&self, features: &FeatureVector) -> FallbackBreakdown {
        let value = |feature: Feature| features.get(feature).unwrap_or(0.0);
        let set = |feature: Feature| value(feature) >= 0.5;

        let age = match value(Feature::AgeYears) {
            a if a >= 60.0 => 25,
            a if a >= 50.0 => 15,
            a if a >= 40.0 => 5,
            _ => 0,
        };

        let (hi, lo) = (value(Feature::ApHi), value(Feature::ApLo));
        let blood_pressure = if hi >= 160.0 || lo >= 100.0 {
            30
        } else if hi >= 140.0 || lo >= 90.0 {
            20
        } else if hi >= 130.0 || lo >= 85.0 {
            10
        } else {
            0
        };

        let bmi = match value(Feature::Bmi) {
            b if b >= 30.0 => 20,
            b if b >= 25.0 => 10,
            _ => 0,
        };

        let cholesterol = match value(Feature::Cholesterol) {
            c if c >= 2.5 => 15,
            c if c >= 1.5 => 8,
            _ => 0,
        };

        let glucose = match value(Feature::Gluc) {
            g if g >= 2.5 => 10,
            g if g >= 1.5 => 5,
            _ => 0,
        };

        let mut lifestyle = 0;
        if set(Feature::Smoke) {
            lifestyle += 10;
        }
        if set(Feature::Alco) {
            lifestyle += 5;
        }
        if !set(Feature::Active) {
            lifestyle += 5;
        }

        FallbackBreakdown {
            age,
            blood_pressure,
            bmi,
            cholesterol,
            glucose,
            lifestyle,
        }
    }

    /// Fixed multiplier applied to the score for a base slot
    pub fn perturbation(slot: SlotId) -> f64 {
        match slot {
            SlotId::Model1 => 0.95,
            SlotId::Model2 => 1.05,
            SlotId::Model3 => 0.98,
            SlotId::Model4 => 1.02,
            SlotId::Model5 | SlotId::Stacking => 1.0,
        }
    }

    /// Synthetic per-slot estimates around a fallback score
    pub fn base_estimates(score: f64) -> BTreeMap<SlotId, f64> {
        SlotId::BASE
            .iter()
            .map(|slot| (*slot, (score * Self::perturbation(*slot)).clamp(0.0, 1.0)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSchema;

    // age, gender, bmi, ap_hi, ap_lo, cholesterol, gluc, smoke, alco, active
    fn minimal(values: [f64; 10]) -> FeatureVector {
        FeatureVector::from_values(FeatureSchema::Minimal, values.to_vec()).unwrap()
    }

    #[test]
    fn test_worst_case_clamps_to_one() {
        let v = minimal([70.0, 1.0, 36.0, 170.0, 110.0, 3.0, 3.0, 1.0, 1.0, 0.0]);
        let scorer = FallbackRiskScorer::new();
        assert_eq!(scorer.breakdown(&v).raw_total(), 120);
        assert_eq!(scorer.score(&v), 1.0);
    }

    #[test]
    fn test_minimal_risk_is_zero() {
        let v = minimal([25.0, 2.0, 20.0, 115.0, 75.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(FallbackRiskScorer::new().score(&v), 0.0);
    }

    #[test]
    fn test_bands() {
        let v = minimal([52.0, 1.0, 26.0, 135.0, 80.0, 2.0, 2.0, 0.0, 0.0, 1.0]);
        let breakdown = FallbackRiskScorer::new().breakdown(&v);
        assert_eq!(
            breakdown,
            FallbackBreakdown {
                age: 15,
                blood_pressure: 10,
                bmi: 10,
                cholesterol: 8,
                glucose: 5,
                lifestyle: 0,
            }
        );
        assert_eq!(FallbackRiskScorer::new().score(&v), 0.48);
    }

    #[test]
    fn test_diastolic_alone_raises_band() {
        let v = minimal([30.0, 1.0, 22.0, 120.0, 100.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(FallbackRiskScorer::new().breakdown(&v).blood_pressure, 30);
    }

    #[test]
    fn test_extended_vector_scores_same_factors() {
        // age, gender, height, weight, ap_hi, ap_lo, chol, gluc, smoke, alco, active,
        // bmi, pulse_pressure, age_group, bmi_group, smoke_age, chol_bmi
        let v = FeatureVector::from_values(
            FeatureSchema::Extended,
            vec![
                61.0, 1.0, 170.0, 90.0, 145.0, 85.0, 1.0, 1.0, 1.0, 0.0, 1.0, 31.14, 60.0, 4.0,
                3.0, 61.0, 31.14,
            ],
        )
        .unwrap();
        // 25 + 20 + 20 + 10
        assert_eq!(FallbackRiskScorer::new().score(&v), 0.75);
    }

    #[test]
    fn test_base_estimates_are_clamped() {
        let estimates = FallbackRiskScorer::base_estimates(1.0);
        assert_eq!(estimates.len(), 5);
        assert_eq!(estimates[&SlotId::Model2], 1.0);
        assert_eq!(estimates[&SlotId::Model1], 0.95);
        assert!(!estimates.contains_key(&SlotId::Stacking));
    }
}
