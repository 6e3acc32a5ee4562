//! Health reporting for the model ensemble
//!
//! Summarizes slot availability as a serializable report and as a colored
//! per-slot check table for the terminal.

use crate::models::{ModelRegistry, SlotId, SlotStatus};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

const SERVICE_NAME: &str = "cardiopredict";

/// Aggregate service state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Every slot loaded
    Healthy,
    /// Some slots loaded
    Degraded,
    /// Nothing loaded, rule-based scoring only
    Fallback,
}

/// Externally reported availability
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub service: String,
    pub status: ServiceStatus,
    pub total_slots: usize,
    pub loaded_count: usize,
    pub all_loaded: bool,
    pub fallback_mode: bool,
    pub models: BTreeMap<SlotId, bool>,
    pub generated_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn from_registry(registry: &ModelRegistry) -> Self {
        let loaded_count = registry.loaded_count();
        let status = if registry.all_loaded() {
            ServiceStatus::Healthy
        } else if loaded_count > 0 {
            ServiceStatus::Degraded
        } else {
            ServiceStatus::Fallback
        };

        Self {
            service: SERVICE_NAME.to_string(),
            status,
            total_slots: registry.total_slots(),
            loaded_count,
            all_loaded: registry.all_loaded(),
            fallback_mode: registry.fallback_mode(),
            models: registry
                .slots()
                .iter()
                .map(|slot| (slot.id(), slot.is_loaded()))
                .collect(),
            generated_at: Utc::now(),
        }
    }
}

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Ensemble diagnostics
pub struct Doctor;

impl Doctor {
    /// One check per slot plus an overall ensemble check
    pub fn run_diagnostics(registry: &ModelRegistry) -> Vec<HealthCheck> {
        let mut checks: Vec<HealthCheck> = registry
            .slots()
            .iter()
            .map(|slot| {
                let status = match slot.status() {
                    SlotStatus::Loaded => HealthStatus::Pass,
                    SlotStatus::Unloaded => HealthStatus::Warn("not loaded yet".to_string()),
                    SlotStatus::LoadFailed { reason } => HealthStatus::Fail(reason.clone()),
                };
                HealthCheck {
                    name: format!("{} ({})", slot.display_name(), slot.id()),
                    status,
                }
            })
            .collect();

        checks.push(Self::check_ensemble(registry));
        checks
    }

    fn check_ensemble(registry: &ModelRegistry) -> HealthCheck {
        let loaded = registry.loaded_count();
        let total = registry.total_slots();
        let status = if registry.all_loaded() {
            HealthStatus::Pass
        } else if loaded > 0 {
            HealthStatus::Warn(format!("{}/{} models loaded", loaded, total))
        } else {
            HealthStatus::Fail("no models loaded, using rule-based fallback".to_string())
        };

        HealthCheck {
            name: "Ensemble".to_string(),
            status,
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n🔍 CardioPredict Model Diagnostics\n");
        println!("{:<34} Status", "Check");
        println!("{}", "=".repeat(70));

        for check in checks {
            let message = match &check.status {
                HealthStatus::Pass => "✅ PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("⚠️  WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("❌ FAIL: {}", msg).red().to_string(),
            };

            println!("{:<34} {}", check.name, message);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}
