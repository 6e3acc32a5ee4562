//! Incoming health record and its type coercion
//!
//! Clients send loosely typed JSON: flags as `0/1` or `true/false`, numbers
//! occasionally as strings, and `ACTIVE` in upper case. Coercion happens
//! here; range validation is left to whoever sits in front of the service.

use crate::errors::{Result, ServiceError};
use serde::{Deserialize, Deserializer, Serialize};

/// Structured input for a single prediction
///
/// Engineered columns (`pulse_pressure`, `age_group`, ...) sent by a client
/// are ignored; the builder derives them so they always agree with the raw
/// fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(deserialize_with = "number")]
    pub age_years: f64,

    /// 0 = female, 1 = male
    #[serde(deserialize_with = "number")]
    pub gender: f64,

    /// Centimetres
    #[serde(default, deserialize_with = "optional_number")]
    pub height: Option<f64>,

    /// Kilograms
    #[serde(default, deserialize_with = "optional_number")]
    pub weight: Option<f64>,

    #[serde(default, deserialize_with = "optional_number")]
    pub bmi: Option<f64>,

    /// Systolic blood pressure
    #[serde(deserialize_with = "number")]
    pub ap_hi: f64,

    /// Diastolic blood pressure
    #[serde(deserialize_with = "number")]
    pub ap_lo: f64,

    /// Category 1..=3
    #[serde(deserialize_with = "number")]
    pub cholesterol: f64,

    /// Category 1..=3
    #[serde(deserialize_with = "number")]
    pub gluc: f64,

    #[serde(deserialize_with = "flag")]
    pub smoke: bool,

    #[serde(deserialize_with = "flag")]
    pub alco: bool,

    #[serde(alias = "ACTIVE", deserialize_with = "flag")]
    pub active: bool,
}

impl HealthRecord {
    /// Parse a JSON payload, reporting coercion failures as client errors
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| ServiceError::InvalidInput(e.to_string()))
    }

    /// Parse an already decoded JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ServiceError::InvalidInput(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Bool(bool),
    Text(String),
}

fn parse_number(raw: Loose) -> std::result::Result<f64, String> {
    match raw {
        Loose::Number(n) => Ok(n),
        Loose::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a valid number", s)),
        Loose::Bool(b) => Err(format!("expected a number, got {}", b)),
    }
}

fn number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Loose::deserialize(deserializer)?;
    parse_number(raw).map_err(serde::de::Error::custom)
}

fn optional_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Loose>::deserialize(deserializer)? {
        Some(raw) => parse_number(raw).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Loose::deserialize(deserializer)? {
        Loose::Bool(b) => Some(b),
        Loose::Number(n) if n == 0.0 => Some(false),
        Loose::Number(n) if n == 1.0 => Some(true),
        Loose::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        Loose::Number(_) => None,
    };
    parsed.ok_or_else(|| serde::de::Error::custom("must be 0, 1, true, or false"))
}
