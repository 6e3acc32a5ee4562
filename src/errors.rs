//! Error types for CardioPredict
//!
//! Failures are layered by scope: a slot that cannot load (`LoadError`),
//! a single predictor invocation (`PredictionError`), and the request or
//! process level (`ServiceError`). Only the last one ever reaches a caller.

use thiserror::Error;

/// Why a model slot ended up `LoadFailed`
#[derive(Error, Debug)]
pub enum LoadError {
    /// Artifact file or remote object does not exist
    #[error("Artifact not found at {location}")]
    NotFound { location: String },

    /// Artifact exists but could not be read
    #[error("Failed to read artifact at {location}: {reason}")]
    Unreadable { location: String, reason: String },

    /// Artifact bytes do not describe a valid model
    #[error("Corrupt artifact at {location}: {reason}")]
    Corrupt { location: String, reason: String },

    /// Model only produces hard class decisions
    #[error("Model kind '{kind}' has no probability output")]
    MissingCapability { kind: String },

    /// Artifact references a feature the deployment schema does not carry
    #[error("Feature '{feature}' is not part of the {schema} schema")]
    SchemaMismatch { feature: String, schema: String },
}

/// Failure of a single predictor call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// Vector was built for a different schema than the predictor was bound to
    #[error("Feature schema mismatch: predictor expects {expected}, vector is {found}")]
    SchemaMismatch { expected: String, found: String },

    /// Predictor raised during evaluation
    #[error("Predictor invocation failed: {0}")]
    Invocation(String),

    /// Predictor produced something that is not a probability
    #[error("Predictor returned invalid probability {0}")]
    InvalidOutput(f64),
}

impl PredictionError {
    /// Schema mismatches abort the request; everything else is absorbed
    pub fn is_fatal(&self) -> bool {
        matches!(self, PredictionError::SchemaMismatch { .. })
    }
}

/// Main error type for request handling and process setup
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Request payload cannot be turned into a feature vector
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Feature vector does not match what the loaded models were bound to
    #[error(transparent)]
    Schema(PredictionError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Request deadline elapsed before inference finished
    #[error("Prediction timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Service error: {0}")]
    Generic(String),
}

impl ServiceError {
    /// Whether the caller sent something malformed (as opposed to a server fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidInput(_) | ServiceError::SerializationError(_)
        )
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Convert anyhow errors to ServiceError
impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServiceError::Timeout { duration_ms: 250 };
        assert!(err.to_string().contains("250"));
    }

    #[test]
    fn test_load_error_mentions_location() {
        let err = LoadError::NotFound {
            location: "models/cat_pipeline_tuned.json".to_string(),
        };
        assert!(err.to_string().contains("cat_pipeline_tuned.json"));
    }

    #[test]
    fn test_only_schema_mismatch_is_fatal() {
        let mismatch = PredictionError::SchemaMismatch {
            expected: "extended".to_string(),
            found: "minimal".to_string(),
        };
        assert!(mismatch.is_fatal());
        assert!(!PredictionError::Invocation("boom".to_string()).is_fatal());
        assert!(!PredictionError::InvalidOutput(f64::NAN).is_fatal());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ServiceError::InvalidInput("bmi".to_string()).is_client_error());
        assert!(!ServiceError::Timeout { duration_ms: 1 }.is_client_error());
    }
}
