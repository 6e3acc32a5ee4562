//! Slot identifiers and per-slot load state

use crate::models::predictor::Predictor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Fixed positions in the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotId {
    Model1,
    Model2,
    Model3,
    Model4,
    Model5,
    Stacking,
}

impl SlotId {
    /// Base-model slots in reporting order
    pub const BASE: [SlotId; 5] = [
        SlotId::Model1,
        SlotId::Model2,
        SlotId::Model3,
        SlotId::Model4,
        SlotId::Model5,
    ];

    /// Every slot, base models first
    pub const ALL: [SlotId; 6] = [
        SlotId::Model1,
        SlotId::Model2,
        SlotId::Model3,
        SlotId::Model4,
        SlotId::Model5,
        SlotId::Stacking,
    ];

    /// Key used in responses and configuration
    pub fn key(&self) -> &'static str {
        match self {
            SlotId::Model1 => "model1",
            SlotId::Model2 => "model2",
            SlotId::Model3 => "model3",
            SlotId::Model4 => "model4",
            SlotId::Model5 => "model5",
            SlotId::Stacking => "stacking",
        }
    }

    /// Human readable model family
    pub fn display_name(&self) -> &'static str {
        match self {
            SlotId::Model1 => "CatBoost",
            SlotId::Model2 => "LightGBM",
            SlotId::Model3 => "Logistic Regression",
            SlotId::Model4 => "Random Forest",
            SlotId::Model5 => "XGBoost",
            SlotId::Stacking => "Stacking Ensemble",
        }
    }

    /// Artifact file name used when configuration does not override it
    pub fn default_filename(&self) -> &'static str {
        match self {
            SlotId::Model1 => "cat_pipeline_tuned.json",
            SlotId::Model2 => "lgbm_pipeline_tuned.json",
            SlotId::Model3 => "logreg_pipeline_tuned.json",
            SlotId::Model4 => "rf_pipeline_tuned.json",
            SlotId::Model5 => "xgb_pipeline_tuned.json",
            SlotId::Stacking => "stacking_pipeline_tuned.json",
        }
    }

    pub fn is_base(&self) -> bool {
        !matches!(self, SlotId::Stacking)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            SlotId::Model1 => 0,
            SlotId::Model2 => 1,
            SlotId::Model3 => 2,
            SlotId::Model4 => 3,
            SlotId::Model5 => 4,
            SlotId::Stacking => 5,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Load state of a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Unloaded,
    Loaded,
    LoadFailed { reason: String },
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Unloaded => "unloaded",
            SlotStatus::Loaded => "loaded",
            SlotStatus::LoadFailed { .. } => "load_failed",
        }
    }
}

/// One predictor position in the registry
///
/// Leaves `Unloaded` exactly once; the predictor handle is present iff the
/// status is `Loaded` and is never replaced afterwards.
#[derive(Clone)]
pub struct ModelSlot {
    id: SlotId,
    location: String,
    status: SlotStatus,
    predictor: Option<Arc<dyn Predictor>>,
}

impl ModelSlot {
    pub(crate) fn new(id: SlotId, location: String) -> Self {
        Self {
            id,
            location,
            status: SlotStatus::Unloaded,
            predictor: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn display_name(&self) -> &'static str {
        self.id.display_name()
    }

    /// Where the artifact was (or would be) read from
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn status(&self) -> &SlotStatus {
        &self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.status == SlotStatus::Loaded
    }

    /// Predictor handle, only for loaded slots
    pub fn predictor(&self) -> Option<&Arc<dyn Predictor>> {
        self.predictor.as_ref()
    }

    /// Unloaded → Loaded; returns false if the slot already transitioned
    pub(crate) fn mark_loaded(&mut self, predictor: Arc<dyn Predictor>) -> bool {
        if self.status != SlotStatus::Unloaded {
            return false;
        }
        self.status = SlotStatus::Loaded;
        self.predictor = Some(predictor);
        true
    }

    /// Unloaded → LoadFailed; returns false if the slot already transitioned
    pub(crate) fn mark_failed(&mut self, reason: String) -> bool {
        if self.status != SlotStatus::Unloaded {
            return false;
        }
        self.status = SlotStatus::LoadFailed { reason };
        true
    }
}

impl fmt::Debug for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSlot")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("status", &self.status)
            .field("predictor", &self.predictor.as_ref().map(|p| p.kind().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PredictionError;
    use crate::features::FeatureVector;

    struct Constant;

    impl Predictor for Constant {
        fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
            Ok(0.5)
        }

        fn kind(&self) -> &str {
            "constant"
        }
    }

    #[test]
    fn test_slot_keys_and_order() {
        let keys: Vec<&str> = SlotId::ALL.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["model1", "model2", "model3", "model4", "model5", "stacking"]);
        assert!(SlotId::BASE.iter().all(|s| s.is_base()));
        assert!(!SlotId::Stacking.is_base());
    }

    #[test]
    fn test_slot_serializes_as_key() {
        assert_eq!(serde_json::to_string(&SlotId::Model4).unwrap(), "\"model4\"");
    }

    #[test]
    fn test_slot_transitions_once() {
        let mut slot = ModelSlot::new(SlotId::Model1, "models/cat.json".to_string());
        assert_eq!(slot.status(), &SlotStatus::Unloaded);
        assert!(slot.predictor().is_none());

        assert!(slot.mark_loaded(Arc::new(Constant)));
        assert!(slot.is_loaded());
        assert!(!slot.mark_failed("late failure".to_string()));
        assert!(!slot.mark_loaded(Arc::new(Constant)));
        assert!(slot.is_loaded());
        assert_eq!(slot.predictor().map(|p| p.kind().to_string()), Some("constant".to_string()));
    }

    #[test]
    fn test_failed_slot_has_no_handle() {
        let mut slot = ModelSlot::new(SlotId::Stacking, "models/stacking.json".to_string());
        assert!(slot.mark_failed("missing".to_string()));
        assert!(!slot.is_loaded());
        assert!(slot.predictor().is_none());
        assert_eq!(slot.status().as_str(), "load_failed");
    }
}
