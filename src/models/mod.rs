//! Ensemble model management
//!
//! This module provides:
//! - The `Predictor` contract every loaded model satisfies
//! - JSON artifact decoding and load-time validation
//! - Artifact sources (local directory, HTTP store)
//! - The slot registry shared by all requests

pub mod artifact;
pub mod predictor;
pub mod registry;
pub mod source;
pub mod types;

// Re-export key types for convenience
pub use artifact::ModelArtifact;
pub use predictor::Predictor;
pub use registry::ModelRegistry;
pub use source::{ArtifactSource, HttpArtifactSource, LocalArtifactSource};
pub use types::{ModelSlot, SlotId, SlotStatus};
