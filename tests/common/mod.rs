//! Shared predictor doubles and inputs for integration tests

#![allow(dead_code)]

use cardiopredict::errors::PredictionError;
use cardiopredict::features::{FeatureSchema, FeatureVector, FeatureVectorBuilder, HealthRecord};
use cardiopredict::models::Predictor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Always returns the same probability
pub struct Fixed(pub f64);

impl Predictor for Fixed {
    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
        Ok(self.0)
    }

    fn kind(&self) -> &str {
        "fixed"
    }
}

/// Raises on every call
pub struct Failing;

impl Predictor for Failing {
    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
        Err(PredictionError::Invocation("model raised".to_string()))
    }

    fn kind(&self) -> &str {
        "failing"
    }
}

/// Indexes past the end of an empty buffer on every call
pub struct Panicking;

impl Predictor for Panicking {
    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
        let leaves: Vec<f64> = Vec::new();
        let index = leaves.len() + 10;
        Ok(leaves[index])
    }

    fn kind(&self) -> &str {
        "panicking"
    }
}

/// Rejects every vector as built for another schema
pub struct WrongSchema;

impl Predictor for WrongSchema {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        Err(PredictionError::SchemaMismatch {
            expected: "extended".to_string(),
            found: features.schema().to_string(),
        })
    }

    fn kind(&self) -> &str {
        "wrong_schema"
    }
}

/// Counts invocations
pub struct Counting {
    pub probability: f64,
    pub calls: Arc<AtomicUsize>,
}

impl Counting {
    pub fn new(probability: f64) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                probability,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl Predictor for Counting {
    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probability)
    }

    fn kind(&self) -> &str {
        "counting"
    }
}

/// Blocks the calling thread before answering
pub struct Slow {
    pub delay: Duration,
    pub probability: f64,
}

impl Predictor for Slow {
    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
        std::thread::sleep(self.delay);
        Ok(self.probability)
    }

    fn kind(&self) -> &str {
        "slow"
    }
}

/// Probability equal to age / 100, handy for checking ordering
pub struct AgeScaled;

impl Predictor for AgeScaled {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        let age = features
            .values()
            .first()
            .copied()
            .ok_or_else(|| PredictionError::Invocation("empty vector".to_string()))?;
        Ok((age / 100.0).clamp(0.0, 1.0))
    }

    fn kind(&self) -> &str {
        "age_scaled"
    }
}

pub fn record(value: serde_json::Value) -> HealthRecord {
    HealthRecord::from_value(value).unwrap()
}

/// Moderate-risk patient with every raw field present
pub fn typical_record() -> HealthRecord {
    record(serde_json::json!({
        "age_years": 55, "gender": 1, "height": 175, "weight": 85,
        "ap_hi": 140, "ap_lo": 90, "cholesterol": 2, "gluc": 1,
        "smoke": 1, "alco": 0, "active": 1
    }))
}

/// Highest fallback band on every factor
pub fn worst_case_record() -> HealthRecord {
    record(serde_json::json!({
        "age_years": 70, "gender": 1, "bmi": 36, "ap_hi": 170, "ap_lo": 110,
        "cholesterol": 3, "gluc": 3, "smoke": 1, "alco": 1, "active": 0
    }))
}

/// No fallback factor triggered
pub fn low_risk_record() -> HealthRecord {
    record(serde_json::json!({
        "age_years": 25, "gender": 2, "bmi": 20, "ap_hi": 115, "ap_lo": 75,
        "cholesterol": 1, "gluc": 1, "smoke": 0, "alco": 0, "active": 1
    }))
}

pub fn minimal_vector(record: &HealthRecord) -> FeatureVector {
    FeatureVectorBuilder::new(FeatureSchema::Minimal)
        .build(record)
        .unwrap()
}

/// Serve `(file, status, body)` routes under `/models/` on a loopback port
///
/// Unknown paths answer 404. Returns the base URL to hand to an HTTP source.
pub async fn serve_artifacts(routes: Vec<(&'static str, u16, Vec<u8>)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(file, _, _)| path == format!("/models/{}", file))
                    .map(|(_, status, body)| (*status, body.clone()))
                    .unwrap_or((404, b"missing".to_vec()));
                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    _ => "Internal Server Error",
                };

                let header = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    reason,
                    body.len()
                );
                let _ = stream.write_all(header.as_bytes()).await;
                let _ = stream.write_all(&body).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{}/models", addr)
}
