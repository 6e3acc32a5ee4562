//! Feature vector construction
//!
//! Pure mapping from a `HealthRecord` to the fixed-order vector of one
//! schema, deriving the engineered columns on the way.

use crate::errors::{Result, ServiceError};
use crate::features::record::HealthRecord;
use crate::features::schema::{Feature, FeatureSchema, FeatureVector};

/// Builds vectors for exactly one schema
#[derive(Debug, Clone, Copy)]
pub struct FeatureVectorBuilder {
    schema: FeatureSchema,
}

impl FeatureVectorBuilder {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    /// Map a record onto the schema
    ///
    /// Fails only when a required value is missing or not finite; the
    /// resulting vector is ready for any predictor bound to the same schema.
    pub fn build(&self, record: &HealthRecord) -> Result<FeatureVector> {
        let bmi = resolve_bmi(record)?;
        if self.schema == FeatureSchema::Extended
            && (record.height.is_none() || record.weight.is_none())
        {
            return Err(ServiceError::InvalidInput(
                "height and weight are required by the extended schema".to_string(),
            ));
        }

        let smoke = flag(record.smoke);
        let values = self
            .schema
            .fields()
            .iter()
            .map(|feature| match feature {
                Feature::AgeYears => record.age_years,
                Feature::Gender => record.gender,
                Feature::Height => record.height.unwrap_or_default(),
                Feature::Weight => record.weight.unwrap_or_default(),
                Feature::ApHi => record.ap_hi,
                Feature::ApLo => record.ap_lo,
                Feature::Cholesterol => record.cholesterol,
                Feature::Gluc => record.gluc,
                Feature::Smoke => smoke,
                Feature::Alco => flag(record.alco),
                Feature::Active => flag(record.active),
                Feature::Bmi => bmi,
                Feature::PulsePressure => record.ap_hi - record.ap_lo,
                Feature::AgeGroup => age_group(record.age_years),
                Feature::BmiGroup => bmi_group(bmi),
                Feature::SmokeAge => smoke * record.age_years,
                Feature::CholBmi => round2(record.cholesterol * bmi),
            })
            .collect();

        FeatureVector::from_values(self.schema, values)
    }
}

fn resolve_bmi(record: &HealthRecord) -> Result<f64> {
    if let Some(bmi) = record.bmi {
        return Ok(bmi);
    }
    match (record.height, record.weight) {
        (Some(height), Some(weight)) if height > 0.0 => {
            let meters = height / 100.0;
            Ok(round2(weight / (meters * meters)))
        }
        (Some(_), Some(_)) => Err(ServiceError::InvalidInput(
            "height must be positive to derive bmi".to_string(),
        )),
        _ => Err(ServiceError::InvalidInput(
            "bmi is required when height and weight are not both given".to_string(),
        )),
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Decade bucket starting at "under 30"
pub fn age_group(age_years: f64) -> f64 {
    match age_years {
        a if a < 30.0 => 0.0,
        a if a < 40.0 => 1.0,
        a if a < 50.0 => 2.0,
        a if a < 60.0 => 3.0,
        a if a < 70.0 => 4.0,
        _ => 5.0,
    }
}

/// 0 normal, 1 underweight, 2 overweight, 3 obese
pub fn bmi_group(bmi: f64) -> f64 {
    match bmi {
        b if b < 18.5 => 1.0,
        b if b < 25.0 => 0.0,
        b if b < 30.0 => 2.0,
        _ => 3.0,
    }
}
