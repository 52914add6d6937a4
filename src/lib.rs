// src/lib.rs
//
// Canonicalization pipeline for plant-collector attribution strings:
// classify -> (optional NER tiebreak) -> atomize -> normalize -> cluster
// into canonical entities.

pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod ner;
pub mod pipeline;
pub mod store;

pub mod utils {
    pub mod atomize;
    pub mod normalize;
    pub mod similarity;
}

pub use classify::{classify_rules, Category, ClassificationResult};
pub use config::{Config, SimilarityWeights};
pub use error::{ConfigError, RecordError};
pub use pipeline::{PipelineDriver, PipelineOutcome};
pub use store::{CanonicalEntity, CanonicalStore, InMemoryStore, NameVariation};
