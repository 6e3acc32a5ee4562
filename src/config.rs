//! Configuration management for CardioPredict
//!
//! Provides TOML-based configuration with defaults, environment overrides
//! and validation.
//! Location: ~/.cardiopredict/config.toml

use crate::ensemble::LabelScheme;
use crate::errors::{Result, ServiceError};
use crate::features::FeatureSchema;
use crate::models::SlotId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Complete configuration for CardioPredict
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub models: ModelsConfig,
    pub artifacts: ArtifactsConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

/// Model directory, schema and per-slot artifact names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub dir: String,
    pub schema: FeatureSchema,
    pub files: SlotFiles,
}

/// Artifact file name per slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotFiles {
    pub model1: String,
    pub model2: String,
    pub model3: String,
    pub model4: String,
    pub model5: String,
    pub stacking: String,
}

/// Remote artifact store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// When set, artifacts are fetched from `<remote_base_url>/<file>`
    pub remote_base_url: Option<String>,
    pub timeout_secs: u64,
}

/// Request handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub deadline_ms: u64,
    pub max_concurrency: usize,
    pub label_scheme: LabelScheme,
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: "./models".to_string(),
            schema: FeatureSchema::Minimal,
            files: SlotFiles::default(),
        }
    }
}

impl Default for SlotFiles {
    fn default() -> Self {
        Self {
            model1: SlotId::Model1.default_filename().to_string(),
            model2: SlotId::Model2.default_filename().to_string(),
            model3: SlotId::Model3.default_filename().to_string(),
            model4: SlotId::Model4.default_filename().to_string(),
            model5: SlotId::Model5.default_filename().to_string(),
            stacking: SlotId::Stacking.default_filename().to_string(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            remote_base_url: None,
            timeout_secs: 30,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 2_000,
            max_concurrency: num_cpus::get().max(1),
            label_scheme: LabelScheme::TwoBand,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SlotFiles {
    /// File name configured for a slot
    pub fn get(&self, id: SlotId) -> &str {
        match id {
            SlotId::Model1 => &self.model1,
            SlotId::Model2 => &self.model2,
            SlotId::Model3 => &self.model3,
            SlotId::Model4 => &self.model4,
            SlotId::Model5 => &self.model5,
            SlotId::Stacking => &self.stacking,
        }
    }

    pub fn to_map(&self) -> BTreeMap<SlotId, String> {
        SlotId::ALL
            .iter()
            .map(|id| (*id, self.get(*id).to_string()))
            .collect()
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ServiceError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".cardiopredict").join("config.toml"))
    }

    /// Apply `MODEL_DIR`, `CARDIO_FEATURE_SCHEMA`, `CARDIO_LOG_JSON` and
    /// `CARDIO_ARTIFACT_URL` from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("MODEL_DIR").filter(|v| !v.trim().is_empty()) {
            self.models.dir = dir;
        }

        if let Some(schema) = lookup("CARDIO_FEATURE_SCHEMA") {
            self.models.schema = schema.parse()?;
        }

        if let Some(json) = lookup("CARDIO_LOG_JSON") {
            self.logging.json = matches!(
                json.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(url) = lookup("CARDIO_ARTIFACT_URL") {
            let url = url.trim().to_string();
            self.artifacts.remote_base_url = if url.is_empty() { None } else { Some(url) };
        }

        self.validate()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.inference.deadline_ms == 0 {
            return Err(ServiceError::ConfigError(
                "deadline_ms must be greater than 0".to_string(),
            ));
        }

        if self.inference.max_concurrency == 0 {
            return Err(ServiceError::ConfigError(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.artifacts.timeout_secs == 0 {
            return Err(ServiceError::ConfigError(
                "artifact timeout_secs must be greater than 0".to_string(),
            ));
        }

        for id in SlotId::ALL {
            if self.models.files.get(id).trim().is_empty() {
                return Err(ServiceError::ConfigError(format!(
                    "Artifact file name for {} must not be empty",
                    id
                )));
            }
        }

        match self.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            _ => {
                return Err(ServiceError::ConfigError(format!(
                    "Invalid log level: {}",
                    self.logging.level
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ServiceError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServiceError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ServiceError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get model directory path
    pub fn model_dir(&self) -> PathBuf {
        Self::expand_path(&self.models.dir)
    }
}
