//! Integration tests for the inference service layer

mod common;

use cardiopredict::config::InferenceConfig;
use cardiopredict::doctor::ServiceStatus;
use cardiopredict::ensemble::{LabelScheme, RiskLabel};
use cardiopredict::features::FeatureSchema;
use cardiopredict::models::{ModelRegistry, SlotId};
use cardiopredict::service::InferenceService;
use cardiopredict::ServiceError;
use common::*;
use std::sync::Arc;
use std::time::Duration;

fn settings(deadline_ms: u64, max_concurrency: usize) -> InferenceConfig {
    InferenceConfig {
        deadline_ms,
        max_concurrency,
        label_scheme: LabelScheme::TwoBand,
    }
}

#[tokio::test]
async fn test_deadline_exceeded_is_timeout() {
    let mut registry = ModelRegistry::in_memory(FeatureSchema::Minimal);
    registry.install(
        SlotId::Model1,
        Arc::new(Slow {
            delay: Duration::from_millis(300),
            probability: 0.4,
        }),
    );
    let service = InferenceService::new(registry, &settings(20, 2));
    assert_eq!(service.deadline(), Duration::from_millis(20));

    let err = service.predict(typical_record()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Timeout { duration_ms: 20 }));
    assert_eq!(service.telemetry().get_stats().timeouts, 1);
    assert_eq!(service.telemetry().get_stats().predictions, 0);
}

#[tokio::test]
async fn test_panicking_model_does_not_fail_request() {
    let mut registry = ModelRegistry::in_memory(FeatureSchema::Minimal);
    registry.install(SlotId::Model1, Arc::new(Fixed(0.4)));
    registry.install(SlotId::Model2, Arc::new(Panicking));
    let service = InferenceService::new(registry, &settings(2_000, 2));

    let outcome = service.predict(typical_record()).await.unwrap();
    assert_eq!(outcome.stacked.probability, 0.4);
    assert_eq!(outcome.base_predictions[&SlotId::Model2], 0.4);
    assert!(!outcome.is_fallback());
}

#[tokio::test]
async fn test_batch_keeps_input_order() {
    let mut registry = ModelRegistry::in_memory(FeatureSchema::Minimal);
    registry.install(SlotId::Model1, Arc::new(AgeScaled));
    let service = InferenceService::new(registry, &settings(2_000, 3));

    let ages = [30, 72, 45, 58, 61, 39, 50];
    let records = ages
        .iter()
        .map(|age| {
            record(serde_json::json!({
                "age_years": age, "gender": 1, "bmi": 24, "ap_hi": 120, "ap_lo": 80,
                "cholesterol": 1, "gluc": 1, "smoke": 0, "alco": 0, "active": 1
            }))
        })
        .collect();

    let results = service.predict_batch(records).await;
    let probabilities: Vec<f64> = results
        .into_iter()
        .map(|r| r.unwrap().stacked.probability)
        .collect();
    let expected: Vec<f64> = ages.iter().map(|a| *a as f64 / 100.0).collect();
    assert_eq!(probabilities, expected);
    assert_eq!(service.telemetry().get_stats().predictions, ages.len());
}

#[tokio::test]
async fn test_batch_reports_bad_lines_in_place() {
    let service = InferenceService::new(
        ModelRegistry::in_memory(FeatureSchema::Minimal),
        &settings(2_000, 4),
    );
    let good = r#"{"age_years": 25, "gender": 2, "bmi": 20, "ap_hi": 115, "ap_lo": 75, "cholesterol": 1, "gluc": 1, "smoke": 0, "alco": 0, "active": 1}"#;
    let input = format!("{}\nnot json\n{}\n", good, good);

    let results = service.predict_json_lines(&input).await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(ServiceError::InvalidInput(_))));
    assert!(results[2].is_ok());

    let stats = service.telemetry().get_stats();
    assert_eq!(stats.rejected_inputs, 1);
    assert_eq!(stats.fallback_predictions, 2);
}

#[tokio::test]
async fn test_missing_bmi_inputs_rejected() {
    let service = InferenceService::new(
        ModelRegistry::in_memory(FeatureSchema::Minimal),
        &settings(2_000, 1),
    );
    let err = service
        .predict_json(
            r#"{"age_years": 50, "gender": 1, "height": 170, "ap_hi": 120, "ap_lo": 80,
                "cholesterol": 1, "gluc": 1, "smoke": 0, "alco": 0, "active": 1}"#,
        )
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_extended_schema_end_to_end() {
    let mut registry = ModelRegistry::in_memory(FeatureSchema::Extended);
    registry.install(SlotId::Model2, Arc::new(Fixed(0.35)));
    let service = InferenceService::new(registry, &settings(2_000, 2));

    let outcome = service.predict(typical_record()).await.unwrap();
    assert_eq!(outcome.stacked.probability, 0.35);
    assert_eq!(outcome.stacked.label, RiskLabel::Low);
    assert_eq!(outcome.base_predictions.len(), 5);

    let stats = service.telemetry().get_stats();
    assert_eq!(stats.stacking_fallbacks, 1);
    assert_eq!(stats.slot_backfills.get(&SlotId::Model1), Some(&1));
}

#[tokio::test]
async fn test_health_report_counts() {
    let mut registry = ModelRegistry::in_memory(FeatureSchema::Minimal);
    registry.install(SlotId::Model1, Arc::new(Fixed(0.5)));
    registry.install(SlotId::Stacking, Arc::new(Fixed(0.5)));
    registry.mark_failed(SlotId::Model2, "corrupt");
    let service = InferenceService::new(registry, &settings(2_000, 2));

    let report = service.health();
    assert_eq!(report.status, ServiceStatus::Degraded);
    assert_eq!(report.total_slots, 6);
    assert_eq!(report.loaded_count, 2);
    assert!(!report.fallback_mode);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["models"]["stacking"], true);
    assert_eq!(json["models"]["model2"], false);
}

#[tokio::test]
async fn test_response_body_shape() {
    let service = InferenceService::new(
        ModelRegistry::in_memory(FeatureSchema::Minimal),
        &settings(2_000, 1),
    );
    let outcome = service.predict(worst_case_record()).await.unwrap();
    let body = serde_json::to_value(&outcome).unwrap();

    assert_eq!(body["stacked"]["probability"], 1.0);
    assert_eq!(body["stacked"]["label"], "High");
    let base = body["base_predictions"].as_object().unwrap();
    let keys: Vec<&str> = base.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["model1", "model2", "model3", "model4", "model5"]);
}
