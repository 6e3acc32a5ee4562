//! Inference service
//!
//! Wires configuration, artifact source, registry and ensemble together and
//! runs each prediction on the blocking pool under a deadline.
//!
//! # Concurrency Model
//!
//! - The registry is loaded once in `start` and then only read
//! - A semaphore bounds in-flight predictions; the permit is held by the
//!   blocking task, so a timed-out prediction still counts until it finishes
//! - Batches keep input order while running up to `max_concurrency` at once

use crate::config::{Config, InferenceConfig};
use crate::doctor::HealthReport;
use crate::ensemble::{EnsembleOutcome, EnsemblePredictor};
use crate::errors::{Result, ServiceError};
use crate::features::{FeatureVectorBuilder, HealthRecord};
use crate::models::{ArtifactSource, HttpArtifactSource, LocalArtifactSource, ModelRegistry};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Request-facing entry point
pub struct InferenceService {
    predictor: Arc<EnsemblePredictor>,
    builder: FeatureVectorBuilder,
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    deadline: Duration,
    telemetry: TelemetryCollector,
}

impl InferenceService {
    /// Build the artifact source from config, load every slot and wrap the
    /// registry
    pub async fn start(config: &Config) -> Result<Self> {
        let source = Self::artifact_source(config)?;
        let mut registry =
            ModelRegistry::new(config.models.schema, source, config.models.files.to_map());
        registry.load_all().await;
        Ok(Self::new(registry, &config.inference))
    }

    /// Wrap an already loaded registry
    pub fn new(registry: ModelRegistry, settings: &InferenceConfig) -> Self {
        let schema = registry.schema();
        let max_concurrency = settings.max_concurrency.max(1);
        Self {
            predictor: Arc::new(EnsemblePredictor::new(
                Arc::new(registry),
                settings.label_scheme,
            )),
            builder: FeatureVectorBuilder::new(schema),
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            deadline: Duration::from_millis(settings.deadline_ms),
            telemetry: TelemetryCollector::new(),
        }
    }

    fn artifact_source(config: &Config) -> Result<Arc<dyn ArtifactSource>> {
        match &config.artifacts.remote_base_url {
            Some(url) => {
                let source = HttpArtifactSource::new(
                    url.clone(),
                    Duration::from_secs(config.artifacts.timeout_secs),
                )
                .map_err(|e| ServiceError::ConfigError(e.to_string()))?;
                Ok(Arc::new(source))
            }
            None => Ok(Arc::new(LocalArtifactSource::new(config.model_dir()))),
        }
    }

    /// Predict for one record
    pub async fn predict(&self, record: HealthRecord) -> Result<EnsembleOutcome> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("predict", request_id = %request_id);
        self.run(request_id, record).instrument(span).await
    }

    /// Parse a JSON object and predict for it
    pub async fn predict_json(&self, payload: &str) -> Result<EnsembleOutcome> {
        match HealthRecord::from_json(payload) {
            Ok(record) => self.predict(record).await,
            Err(e) => {
                self.reject(&Uuid::new_v4().to_string(), &e);
                Err(e)
            }
        }
    }

    /// Predict for many records, results in input order
    pub async fn predict_batch(&self, records: Vec<HealthRecord>) -> Vec<Result<EnsembleOutcome>> {
        stream::iter(records.into_iter().map(|record| self.predict(record)))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// Predict for JSON lines; blank lines are skipped
    pub async fn predict_json_lines(&self, input: &str) -> Vec<Result<EnsembleOutcome>> {
        stream::iter(
            input
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| self.predict_json(line)),
        )
        .buffered(self.max_concurrency)
        .collect()
        .await
    }

    async fn run(&self, request_id: String, record: HealthRecord) -> Result<EnsembleOutcome> {
        let started = Instant::now();

        let vector = match self.builder.build(&record) {
            Ok(vector) => vector,
            Err(e) => {
                self.reject(&request_id, &e);
                return Err(e);
            }
        };

        let predictor = Arc::clone(&self.predictor);
        let semaphore = Arc::clone(&self.semaphore);
        let span = Span::current();
        let work = async move {
            let permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| ServiceError::Generic("prediction limiter closed".to_string()))?;

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _entered = span.enter();
                predictor.predict(&vector)
            })
            .await
            .map_err(|e| ServiceError::Generic(format!("prediction task failed: {}", e)))?
        };

        let outcome = match tokio::time::timeout(self.deadline, work).await {
            Ok(result) => result?,
            Err(_) => {
                let deadline_ms = self.deadline.as_millis() as u64;
                warn!(deadline_ms, "Prediction deadline exceeded");
                self.telemetry.record(TelemetryEvent::TimedOut {
                    request_id,
                    deadline_ms,
                    timestamp: Instant::now(),
                });
                return Err(ServiceError::Timeout {
                    duration_ms: deadline_ms,
                });
            }
        };

        let elapsed = started.elapsed();
        debug!(
            probability = outcome.probability(),
            label = %outcome.label(),
            source = ?outcome.diagnostics.source,
            elapsed_ms = elapsed.as_millis() as u64,
            "Prediction completed"
        );
        self.telemetry
            .record(TelemetryEvent::completed(&request_id, &outcome, elapsed));
        Ok(outcome)
    }

    fn reject(&self, request_id: &str, error: &ServiceError) {
        info!(request_id, error = %error, "Rejected prediction input");
        self.telemetry.record(TelemetryEvent::InputRejected {
            request_id: request_id.to_string(),
            reason: error.to_string(),
            timestamp: Instant::now(),
        });
    }

    /// Current availability report
    pub fn health(&self) -> HealthReport {
        HealthReport::from_registry(self.registry())
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.predictor.registry()
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}
