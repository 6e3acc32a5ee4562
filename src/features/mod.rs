//! Request records and model-ready feature vectors
//!
//! - `record`: loosely typed input with coercion
//! - `schema`: the two schema revisions and the immutable vector
//! - `builder`: record → vector, including engineered columns

pub mod builder;
pub mod record;
pub mod schema;

pub use builder::FeatureVectorBuilder;
pub use record::HealthRecord;
pub use schema::{Feature, FeatureSchema, FeatureVector};
