// src/error.rs

use thiserror::Error;

/// Error raised at startup when a `Config` fails validation. Fatal for the
/// whole run — never surfaced per-record.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("similarity weights must sum to 1.0, got {0}")]
    WeightsDoNotSumToOne(f64),
    #[error("similarity weight must be non-negative, got {0}")]
    NegativeWeight(f64),
    #[error("{0} must be in [0,1], got {1}")]
    ThresholdOutOfRange(&'static str, f64),
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,
}

/// Record-level error taxonomy (spec §7). These never abort a run; the
/// driver logs a one-line message and continues with the next record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("store write failed for {canonical_name:?}: {reason}")]
    StoreWrite {
        canonical_name: String,
        reason: String,
    },
    #[error("unique-index race on ({canonical_name:?}, {entity_type:?}) survived retry")]
    InvariantViolation {
        canonical_name: String,
        entity_type: String,
    },
    #[error("record discarded: {0}")]
    Discarded(String),
}
