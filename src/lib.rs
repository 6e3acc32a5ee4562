//! CardioPredict - Ensemble inference for cardiovascular risk
//!
//! Serves a risk probability and label from five independently trained base
//! classifiers and a stacking meta-model, degrading to averaging and then to
//! rule-based scoring as models become unavailable.
//!
//! # Architecture
//!
//! - **features**: request record → fixed-order feature vector
//! - **models**: artifacts, artifact sources, slot registry
//! - **ensemble**: per-request inference, fallback scoring, outcome shape
//! - **service**: deadlines, concurrency limits, batches, health

pub mod errors;

// Re-export commonly used types
pub use errors::{Result, ServiceError};

// Core inference
pub mod ensemble;
pub mod features;
pub mod models;

// Service & interface layer
pub mod cli;
pub mod config;
pub mod doctor;
pub mod logging;
pub mod service;
pub mod telemetry;
