//! Property tests for rule-based fallback scoring

use cardiopredict::ensemble::{FallbackRiskScorer, OutcomeAssembler};
use cardiopredict::features::{FeatureSchema, FeatureVector};
use quickcheck_macros::quickcheck;

#[derive(Debug, Clone, Copy)]
struct Patient {
    age: u8,
    bmi_tenths: u16,
    ap_hi: u16,
    ap_lo: u16,
    cholesterol: u8,
    gluc: u8,
    smoke: bool,
    alco: bool,
    active: bool,
}

impl Patient {
    #[allow(clippy::too_many_arguments)]
    fn new(
        age: u8,
        bmi_tenths: u16,
        ap_hi: u16,
        ap_lo: u16,
        cholesterol: u8,
        gluc: u8,
        smoke: bool,
        alco: bool,
        active: bool,
    ) -> Self {
        Self {
            age,
            bmi_tenths,
            ap_hi,
            ap_lo,
            cholesterol: cholesterol % 3 + 1,
            gluc: gluc % 3 + 1,
            smoke,
            alco,
            active,
        }
    }

    fn vector(&self) -> FeatureVector {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        FeatureVector::from_values(
            FeatureSchema::Minimal,
            vec![
                self.age as f64,
                1.0,
                self.bmi_tenths as f64 / 10.0,
                self.ap_hi as f64,
                self.ap_lo as f64,
                self.cholesterol as f64,
                self.gluc as f64,
                flag(self.smoke),
                flag(self.alco),
                flag(self.active),
            ],
        )
        .unwrap()
    }
}

#[quickcheck]
fn score_is_a_probability(
    age: u8,
    bmi_tenths: u16,
    ap_hi: u16,
    ap_lo: u16,
    labs: (u8, u8),
    smoke: bool,
    alco: bool,
    active: bool,
) -> bool {
    let (cholesterol, gluc) = labs;
    let patient = Patient::new(age, bmi_tenths, ap_hi, ap_lo, cholesterol, gluc, smoke, alco, active);
    let score = FallbackRiskScorer::new().score(&patient.vector());
    (0.0..=1.0).contains(&score)
}

#[quickcheck]
fn score_is_deterministic(age: u8, ap_hi: u16, smoke: bool) -> bool {
    let patient = Patient::new(age, 250, ap_hi, 80, 1, 1, smoke, false, true);
    let scorer = FallbackRiskScorer::new();
    scorer.score(&patient.vector()) == scorer.score(&patient.vector())
}

#[quickcheck]
fn smoking_never_lowers_risk(age: u8, bmi_tenths: u16, ap_hi: u16, ap_lo: u16) -> bool {
    let scorer = FallbackRiskScorer::new();
    let non_smoker = Patient::new(age, bmi_tenths, ap_hi, ap_lo, 1, 1, false, false, true);
    let smoker = Patient { smoke: true, ..non_smoker };
    scorer.score(&smoker.vector()) >= scorer.score(&non_smoker.vector())
}

#[quickcheck]
fn breakdown_respects_factor_caps(age: u8, bmi_tenths: u16, ap_hi: u16, ap_lo: u16, smoke: bool) -> bool {
    let patient = Patient::new(age, bmi_tenths, ap_hi, ap_lo, 2, 2, smoke, true, false);
    let breakdown = FallbackRiskScorer::new().breakdown(&patient.vector());
    breakdown.age <= 25
        && breakdown.blood_pressure <= 30
        && breakdown.bmi <= 20
        && breakdown.cholesterol <= 15
        && breakdown.glucose <= 10
        && breakdown.lifestyle <= 20
        && breakdown.points() <= 100
}

#[quickcheck]
fn fallback_outcome_entries_are_clamped(points: u8) -> bool {
    let score = (points % 101) as f64 / 100.0;
    let outcome = OutcomeAssembler::default().from_fallback(score);
    outcome.base_predictions.len() == 5
        && outcome.base_predictions.values().all(|p| (0.0..=1.0).contains(p))
        && outcome.stacked.probability == score
}
