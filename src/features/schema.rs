//! Feature schemas and the immutable feature vector
//!
//! A schema is the exact, ordered field list a set of model artifacts was
//! trained against. Artifacts and the vector builder are deployed as a pair:
//! the registry binds every artifact to one schema at load time and the
//! predictors refuse vectors built for any other schema.

use crate::errors::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named input fields known to any schema revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AgeYears,
    Gender,
    Height,
    Weight,
    ApHi,
    ApLo,
    Cholesterol,
    Gluc,
    Smoke,
    Alco,
    Active,
    Bmi,
    PulsePressure,
    AgeGroup,
    BmiGroup,
    SmokeAge,
    CholBmi,
}

impl Feature {
    /// Column name used by the training pipeline
    pub fn name(&self) -> &'static str {
        match self {
            Feature::AgeYears => "age_years",
            Feature::Gender => "gender",
            Feature::Height => "height",
            Feature::Weight => "weight",
            Feature::ApHi => "ap_hi",
            Feature::ApLo => "ap_lo",
            Feature::Cholesterol => "cholesterol",
            Feature::Gluc => "gluc",
            Feature::Smoke => "smoke",
            Feature::Alco => "alco",
            Feature::Active => "active",
            Feature::Bmi => "bmi",
            Feature::PulsePressure => "pulse_pressure",
            Feature::AgeGroup => "age_group",
            Feature::BmiGroup => "bmi_group",
            Feature::SmokeAge => "smoke_age",
            Feature::CholBmi => "chol_bmi",
        }
    }

    /// Look up a feature by column name
    pub fn from_name(name: &str) -> Option<Feature> {
        EXTENDED_FIELDS.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const MINIMAL_FIELDS: [Feature; 10] = [
    Feature::AgeYears,
    Feature::Gender,
    Feature::Bmi,
    Feature::ApHi,
    Feature::ApLo,
    Feature::Cholesterol,
    Feature::Gluc,
    Feature::Smoke,
    Feature::Alco,
    Feature::Active,
];

const EXTENDED_FIELDS: [Feature; 17] = [
    Feature::AgeYears,
    Feature::Gender,
    Feature::Height,
    Feature::Weight,
    Feature::ApHi,
    Feature::ApLo,
    Feature::Cholesterol,
    Feature::Gluc,
    Feature::Smoke,
    Feature::Alco,
    Feature::Active,
    Feature::Bmi,
    Feature::PulsePressure,
    Feature::AgeGroup,
    Feature::BmiGroup,
    Feature::SmokeAge,
    Feature::CholBmi,
];

/// Schema revision a deployment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    /// Raw clinical fields plus BMI
    #[default]
    Minimal,
    /// Raw fields plus engineered interaction terms
    Extended,
}

impl FeatureSchema {
    /// Ordered field list
    pub fn fields(&self) -> &'static [Feature] {
        match self {
            FeatureSchema::Minimal => &MINIMAL_FIELDS,
            FeatureSchema::Extended => &EXTENDED_FIELDS,
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields().len()
    }

    /// Schemas are never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of a feature within this schema
    pub fn position(&self, feature: Feature) -> Option<usize> {
        self.fields().iter().position(|f| *f == feature)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSchema::Minimal => "minimal",
            FeatureSchema::Extended => "extended",
        }
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureSchema {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(FeatureSchema::Minimal),
            "extended" => Ok(FeatureSchema::Extended),
            other => Err(ServiceError::ConfigError(format!(
                "Unknown feature schema: {}",
                other
            ))),
        }
    }
}

/// Ordered numeric input for one request
///
/// Values are stored in schema order and never change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap raw values that are already in schema order
    pub fn from_values(schema: FeatureSchema, values: Vec<f64>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(ServiceError::InvalidInput(format!(
                "{} schema expects {} values, got {}",
                schema,
                schema.len(),
                values.len()
            )));
        }
        if let Some((feature, value)) = schema
            .fields()
            .iter()
            .zip(&values)
            .find(|(_, v)| !v.is_finite())
        {
            return Err(ServiceError::InvalidInput(format!(
                "{} must be a finite number, got {}",
                feature, value
            )));
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    /// Values in schema order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named feature, if the schema carries it
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.schema.position(feature).map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
