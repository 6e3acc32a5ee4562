//! Model registry
//!
//! Owns the six ensemble slots. Loading goes through `&mut self` once at
//! startup; afterwards the registry is shared behind an `Arc` and only read.

use crate::errors::LoadError;
use crate::features::FeatureSchema;
use crate::models::artifact::ModelArtifact;
use crate::models::predictor::Predictor;
use crate::models::source::{Artifact, ArtifactSource};
use crate::models::types::{ModelSlot, SlotId, SlotStatus};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Source used by registries that are populated by hand
struct DetachedSource;

#[async_trait]
impl ArtifactSource for DetachedSource {
    fn locate(&self, file_name: &str) -> String {
        format!("memory://{}", file_name)
    }

    async fn fetch(&self, file_name: &str) -> Result<Artifact, LoadError> {
        Err(LoadError::NotFound {
            location: self.locate(file_name),
        })
    }

    fn describe(&self) -> String {
        "in-memory registry".to_string()
    }
}

/// Registry of ensemble slots
pub struct ModelRegistry {
    schema: FeatureSchema,
    source: Arc<dyn ArtifactSource>,
    files: BTreeMap<SlotId, String>,
    slots: Vec<ModelSlot>,
}

impl ModelRegistry {
    /// Create a registry with every slot `Unloaded`
    ///
    /// `files` overrides artifact file names per slot; missing entries use
    /// the slot's default file name.
    pub fn new(
        schema: FeatureSchema,
        source: Arc<dyn ArtifactSource>,
        files: BTreeMap<SlotId, String>,
    ) -> Self {
        let files: BTreeMap<SlotId, String> = SlotId::ALL
            .iter()
            .map(|id| {
                let file = files
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| id.default_filename().to_string());
                (*id, file)
            })
            .collect();

        let slots = SlotId::ALL
            .iter()
            .map(|id| ModelSlot::new(*id, source.locate(&files[id])))
            .collect();

        Self {
            schema,
            source,
            files,
            slots,
        }
    }

    /// Registry without a backing source, filled through `install`
    pub fn in_memory(schema: FeatureSchema) -> Self {
        Self::new(schema, Arc::new(DetachedSource), BTreeMap::new())
    }

    /// Load every slot that has not been resolved yet
    ///
    /// Each slot fails independently. Returns whether at least one slot is
    /// loaded; `false` means requests will be served by fallback scoring.
    pub async fn load_all(&mut self) -> bool {
        info!(
            source = %self.source.describe(),
            schema = %self.schema,
            "Loading ensemble models"
        );

        let inventory = self.source.inventory().await;
        if !inventory.is_empty() {
            info!(count = inventory.len(), "Artifacts available");
            for entry in &inventory {
                debug!(file = %entry.name, size_kb = entry.size_bytes / 1024, "Artifact");
            }
        }

        for id in SlotId::ALL {
            if self.slots[id.index()].status() != &SlotStatus::Unloaded {
                continue;
            }

            let file = self.files[&id].clone();
            match self.load_slot(&file).await {
                Ok((predictor, size_bytes)) => {
                    info!(
                        slot = %id,
                        model = id.display_name(),
                        kind = predictor.kind(),
                        size_kb = size_bytes / 1024,
                        "Model loaded"
                    );
                    self.slots[id.index()].mark_loaded(predictor);
                }
                Err(e) => {
                    error!(slot = %id, model = id.display_name(), error = %e, "Model failed to load");
                    self.slots[id.index()].mark_failed(e.to_string());
                }
            }
        }

        let loaded = self.loaded_count();
        let total = self.total_slots();
        if loaded == total {
            info!(loaded, total, "All models loaded");
        } else if loaded > 0 {
            warn!(loaded, total, "Running with partial ensemble");
        } else {
            warn!(total, "No models loaded, predictions use rule-based fallback");
        }

        loaded > 0
    }

    async fn load_slot(&self, file: &str) -> Result<(Arc<dyn Predictor>, u64), LoadError> {
        let artifact = self.source.fetch(file).await?;
        let size_bytes = artifact.bytes.len() as u64;
        let model = ModelArtifact::from_slice(&artifact.bytes, &artifact.location)?;
        let predictor = model.bind(self.schema, &artifact.location)?;
        Ok((Arc::from(predictor), size_bytes))
    }

    /// Place a predictor directly into an unresolved slot
    ///
    /// Returns false if the slot was already loaded or failed.
    pub fn install(&mut self, id: SlotId, predictor: Arc<dyn Predictor>) -> bool {
        self.slots[id.index()].mark_loaded(predictor)
    }

    /// Record a slot as failed without touching the source
    pub fn mark_failed(&mut self, id: SlotId, reason: impl Into<String>) -> bool {
        self.slots[id.index()].mark_failed(reason.into())
    }

    pub fn slot(&self, id: SlotId) -> &ModelSlot {
        &self.slots[id.index()]
    }

    /// All slots, base models first
    pub fn slots(&self) -> &[ModelSlot] {
        &self.slots
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_loaded()).count()
    }

    pub fn all_loaded(&self) -> bool {
        self.loaded_count() == self.total_slots()
    }

    /// No slot is usable
    pub fn fallback_mode(&self) -> bool {
        self.loaded_count() == 0
    }

    /// Description of where artifacts are read from
    pub fn source_description(&self) -> String {
        self.source.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PredictionError;
    use crate::features::FeatureVector;

    struct Fixed(f64);

    impl Predictor for Fixed {
        fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
            Ok(self.0)
        }

        fn kind(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_new_registry_is_unloaded() {
        let registry = ModelRegistry::in_memory(FeatureSchema::Minimal);
        assert_eq!(registry.total_slots(), 6);
        assert_eq!(registry.loaded_count(), 0);
        assert!(registry.fallback_mode());
        assert!(!registry.all_loaded());
        for slot in registry.slots() {
            assert_eq!(slot.status(), &SlotStatus::Unloaded);
        }
    }

    #[test]
    fn test_default_file_names_resolve_to_locations() {
        let registry = ModelRegistry::in_memory(FeatureSchema::Minimal);
        assert_eq!(
            registry.slot(SlotId::Model5).location(),
            "memory://xgb_pipeline_tuned.json"
        );
    }

    #[test]
    fn test_file_override() {
        let mut files = BTreeMap::new();
        files.insert(SlotId::Stacking, "meta.json".to_string());
        let registry = ModelRegistry::new(FeatureSchema::Minimal, Arc::new(DetachedSource), files);
        assert_eq!(registry.slot(SlotId::Stacking).location(), "memory://meta.json");
        assert_eq!(
            registry.slot(SlotId::Model1).location(),
            "memory://cat_pipeline_tuned.json"
        );
    }

    #[test]
    fn test_install_is_write_once() {
        let mut registry = ModelRegistry::in_memory(FeatureSchema::Minimal);
        assert!(registry.install(SlotId::Model2, Arc::new(Fixed(0.4))));
        assert!(!registry.install(SlotId::Model2, Arc::new(Fixed(0.9))));
        assert!(!registry.mark_failed(SlotId::Model2, "late"));
        assert!(registry.slot(SlotId::Model2).is_loaded());
        assert_eq!(registry.loaded_count(), 1);
        assert!(!registry.fallback_mode());
    }

    #[tokio::test]
    async fn test_load_all_keeps_installed_slots() {
        let mut registry = ModelRegistry::in_memory(FeatureSchema::Minimal);
        registry.install(SlotId::Model3, Arc::new(Fixed(0.2)));

        assert!(registry.load_all().await);
        assert!(registry.slot(SlotId::Model3).is_loaded());
        assert_eq!(registry.loaded_count(), 1);
        assert!(matches!(
            registry.slot(SlotId::Model1).status(),
            SlotStatus::LoadFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_load_all_with_nothing_reports_fallback() {
        let mut registry = ModelRegistry::in_memory(FeatureSchema::Extended);
        assert!(!registry.load_all().await);
        assert!(registry.fallback_mode());
        // second pass leaves resolved slots untouched
        assert!(!registry.load_all().await);
        assert_eq!(registry.loaded_count(), 0);
    }
}
