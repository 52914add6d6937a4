// src/config.rs

use crate::error::ConfigError;

/// Weights for the combined similarity score (spec §4.1). Must sum to 1
/// and be non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub edit: f64,
    pub jaro_winkler: f64,
    pub phonetic: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        SimilarityWeights {
            edit: 0.3,
            jaro_winkler: 0.4,
            phonetic: 0.3,
        }
    }
}

impl SimilarityWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        for w in [self.edit, self.jaro_winkler, self.phonetic] {
            if w < 0.0 {
                return Err(ConfigError::NegativeWeight(w));
            }
        }
        let sum = self.edit + self.jaro_winkler + self.phonetic;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::WeightsDoNotSumToOne(sum));
        }
        Ok(())
    }
}

/// Recognized configuration options (spec §6). Passed explicitly down the
/// call stack; there are no hidden globals.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub confidence_threshold: f64,
    pub ner_trigger_threshold: f64,
    pub ner_timeout_seconds: u64,
    pub similarity_weights: SimilarityWeights,
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            confidence_threshold: 0.70,
            ner_trigger_threshold: 0.85,
            ner_timeout_seconds: 5,
            similarity_weights: SimilarityWeights::default(),
            batch_size: 10_000,
        }
    }
}

impl Config {
    /// Detected at startup, fatal for the whole run if it fails (spec §7).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.similarity_weights.validate()?;

        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("ner_trigger_threshold", self.ner_trigger_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange(name, value));
            }
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut cfg = Config::default();
        cfg.similarity_weights.edit = 0.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::WeightsDoNotSumToOne(_))
        ));
    }

    #[test]
    fn negative_weight_rejected() {
        let mut cfg = Config::default();
        cfg.similarity_weights.edit = -0.1;
        cfg.similarity_weights.jaro_winkler = 0.8;
        assert!(matches!(cfg.validate(), Err(ConfigError::NegativeWeight(_))));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let mut cfg = Config::default();
        cfg.ner_trigger_threshold = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ThresholdOutOfRange("ner_trigger_threshold", _))
        ));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let mut cfg = Config::default();
        cfg.batch_size = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroBatchSize)));
    }
}
