// src/pipeline.rs
//
// Wires classification, NER tiebreaking, atomization, normalization, and
// canonicalization into the single per-record flow of spec §4.7. Pure
// scoring work (classify + atomize + normalize) is fanned out with rayon;
// store writes are applied in input order on the calling thread so
// variation occurrence counts and `first_seen`/`last_seen` stay
// deterministic for a given input.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::classify::{classify_rules, Category, ClassificationResult, PatternTag};
use crate::config::Config;
use crate::error::RecordError;
use crate::ner::{apply_ner_adjustment, should_invoke, NerAdapter};
use crate::store::{CanonicalEntity, CanonicalStore};
use crate::utils::atomize::atomize;
use crate::utils::normalize::{canonical_display, is_structurally_rejected, normalize};

/// What happened to one raw collector string.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Canonicalized {
        raw_text: String,
        entity: CanonicalEntity,
        match_score: Option<f64>,
    },
    Discarded {
        raw_text: String,
        reason: String,
    },
}

/// A rule/NER confidence below this is raised to exactly 0.70 (spec §7).
/// Category is left as-is: a result that already named a real category
/// (`Pessoa`, `Empresa`, `GrupoPessoas`, `ConjuntoPessoas`) keeps it, since
/// the low number here reflects an unconfirmed NER tiebreak rather than an
/// actually-unparseable record — the latter case is already `NaoDeterminado`
/// by the time it reaches this function (the rule classifier's own default
/// bucket), so the floor still reads as a category switch for genuine junk.
const CONFIDENCE_FLOOR: f64 = 0.70;

fn raise_confidence_floor(mut result: ClassificationResult) -> ClassificationResult {
    if result.confidence < CONFIDENCE_FLOOR {
        result.confidence = CONFIDENCE_FLOOR;
    }
    result
}

pub struct PipelineDriver<S, N> {
    config: Config,
    store: S,
    ner: N,
}

impl<S, N> PipelineDriver<S, N>
where
    S: CanonicalStore + Sync,
    N: NerAdapter,
{
    pub fn new(config: Config, store: S, ner: N) -> Self {
        PipelineDriver { config, store, ner }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run classification, the optional NER tiebreak, and atomization for
    /// one raw string. Returns `Err(reason)` when the record must be
    /// discarded outright rather than upserted: either the raw-input guard
    /// of spec §8 scenario 8 (leading digit, leading separator character,
    /// or a bare generic single word), or the narrow case the NER adapter
    /// marks as "no entities, too little text" (spec §4.5/§7).
    fn classify_and_split(&self, raw: &str) -> Result<Vec<(String, Category, f64)>, &'static str> {
        let rule_result = classify_rules(raw);

        if !rule_result.patterns_matched.contains(&PatternTag::ExactUnknown) && is_structurally_rejected(raw) {
            return Err("input is structurally too degenerate to canonicalize");
        }

        let result = if should_invoke(rule_result.confidence, self.config.ner_trigger_threshold) {
            let timeout = Duration::from_secs(self.config.ner_timeout_seconds);
            match self.ner.classify(raw, rule_result.confidence, timeout) {
                Ok(ner_output) => apply_ner_adjustment(&rule_result, &ner_output).ok_or("NER: no entities detected for short text")?,
                Err(_) => raise_confidence_floor(rule_result),
            }
        } else {
            rule_result
        };

        let result = raise_confidence_floor(result);
        let ClassificationResult { category, confidence, .. } = result;

        Ok(if category == Category::ConjuntoPessoas {
            atomize(raw, category)
                .into_iter()
                .map(|atom| (atom.text, Category::Pessoa, confidence))
                .collect()
        } else {
            vec![(raw.to_string(), category, confidence)]
        })
    }

    /// Process one raw record end to end, writing through to the store.
    /// A `ConjuntoPessoas` input yields one outcome per atom; a rejected or
    /// NER-discarded record yields a single `Discarded` outcome.
    pub fn process_one(&self, raw: &str, now: DateTime<Utc>) -> Vec<PipelineOutcome> {
        match self.classify_and_split(raw) {
            Err(reason) => vec![PipelineOutcome::Discarded {
                raw_text: raw.to_string(),
                reason: reason.to_string(),
            }],
            Ok(atoms) => atoms
                .into_iter()
                .map(|(text, category, classification_confidence)| self.normalize_and_store(raw, &text, category, classification_confidence, now))
                .collect(),
        }
    }

    /// Normalize one atom (or the whole record, for non-`ConjuntoPessoas`
    /// inputs) and upsert it. `NaoDeterminado` atoms skip comparison-key
    /// derivation and keep their text unchanged, per spec §4.4/§7 — they
    /// are still persisted, just never reshaped. An atom whose comparison
    /// key turns out unfit after normalization (empty, too short, too
    /// generic) is reclassified as `NaoDeterminado` at confidence 0.70
    /// rather than discarded (spec §4.2) — this is a narrower, later-stage
    /// check than the raw-input guard in `classify_and_split`.
    fn normalize_and_store(
        &self,
        original_raw: &str,
        atom_text: &str,
        category: Category,
        classification_confidence: f64,
        now: DateTime<Utc>,
    ) -> PipelineOutcome {
        let (comparison_key, display_form, category, classification_confidence) = if category == Category::NaoDeterminado {
            let display = atom_text.trim().to_string();
            if display.is_empty() {
                return PipelineOutcome::Discarded {
                    raw_text: original_raw.to_string(),
                    reason: "empty after trimming".to_string(),
                };
            }
            let key = display.to_uppercase();
            (key, display, category, classification_confidence)
        } else {
            match normalize(atom_text) {
                Ok(n) => (n.comparison_key, n.display_form, category, classification_confidence),
                Err(_) => {
                    let display = atom_text.trim().to_string();
                    if display.is_empty() {
                        return PipelineOutcome::Discarded {
                            raw_text: original_raw.to_string(),
                            reason: "empty after trimming".to_string(),
                        };
                    }
                    let key = display.to_uppercase();
                    (key, display, Category::NaoDeterminado, CONFIDENCE_FLOOR)
                }
            }
        };

        let existing = self.store.find_similar(&comparison_key, category, self.config.confidence_threshold, &self.config.similarity_weights);

        let (canonical_name, match_score) = match &existing {
            Some((entity, score)) => (entity.canonical_name.clone(), Some(*score)),
            None => (canonical_display(&display_form, category), None),
        };

        let association_confidence = match_score.unwrap_or(1.0);

        match self.upsert_with_retry(&canonical_name, category, &display_form, association_confidence, classification_confidence, now) {
            Ok(entity) => PipelineOutcome::Canonicalized {
                raw_text: original_raw.to_string(),
                entity,
                match_score,
            },
            Err(_) => PipelineOutcome::Discarded {
                raw_text: original_raw.to_string(),
                reason: "store write failed".to_string(),
            },
        }
    }

    /// One retry on an invariant violation (spec §7: per-record errors are
    /// logged and the run continues; a unique-index race gets one retry
    /// before the record is discarded).
    fn upsert_with_retry(
        &self,
        canonical_name: &str,
        entity_type: Category,
        variation_text: &str,
        association_confidence: f64,
        classification_confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<CanonicalEntity, RecordError> {
        match self.store.upsert(canonical_name, entity_type, variation_text, association_confidence, classification_confidence, now) {
            Ok(e) => Ok(e),
            Err(_) => self.store.upsert(canonical_name, entity_type, variation_text, association_confidence, classification_confidence, now),
        }
    }

    /// Process a batch of raw lines. Classification and atomization run in
    /// parallel across the batch (rayon); store writes happen afterward, in
    /// input order, on the calling thread — the single-writer store makes
    /// that the natural serialization point (spec §5/§6).
    pub fn process_batch(&self, lines: &[String], now: DateTime<Utc>) -> Vec<PipelineOutcome> {
        let classified: Vec<Vec<(String, Result<(String, Category, f64), &'static str>)>> = lines
            .par_iter()
            .map(|raw| match self.classify_and_split(raw) {
                Err(reason) => vec![(raw.clone(), Err(reason))],
                Ok(atoms) => atoms.into_iter().map(|r| (raw.clone(), Ok(r))).collect(),
            })
            .collect();

        classified
            .into_iter()
            .flatten()
            .map(|(original, atom)| match atom {
                Err(reason) => PipelineOutcome::Discarded {
                    raw_text: original,
                    reason: reason.to_string(),
                },
                Ok((text, category, confidence)) => self.normalize_and_store(&original, &text, category, confidence, now),
            })
            .collect()
    }
}
