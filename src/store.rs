// src/store.rs
//
// Online clustering over persisted canonical entities (spec §4.6). Follows
// the "global mutable store → owned, single-writer state" redesign: one
// component owns all mutation, guarded by a mutex around the
// find_similar+upsert critical section (spec §5). `CanonicalStore` is the
// logical-schema contract; `InMemoryStore` is the one concrete
// implementation this crate ships — an actual embedded analytical engine
// is an external collaborator per spec §1/§6.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Category;
use crate::config::SimilarityWeights;
use crate::error::RecordError;
use crate::utils::normalize::pessoa_identity_match;
use crate::utils::similarity::combined_score;

/// Mirrors one element of the `variations` JSON array in spec §6's logical
/// schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameVariation {
    pub variation_text: String,
    pub occurrence_count: u64,
    pub association_confidence: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Mirrors one row of spec §6's logical persistent-store schema. A real
/// embedded-database backing would serialize this (via `serde_json`) into
/// its `variations` JSON column; `InMemoryStore` here keeps the struct
/// itself as the source of truth and never round-trips it through JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: u64,
    pub canonical_name: String,
    pub entity_type: Category,
    pub classification_confidence: f64,
    pub grouping_confidence: f64,
    pub variations: Vec<NameVariation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalEntity {
    /// Best similarity of `key` against this entity's variations (spec
    /// §4.6 step 3), with the all-alphabetic short-circuit to 1.0. For a
    /// `Pessoa` entity, a surname match with compatible (prefix-related)
    /// initials also short-circuits to 1.0 — initials are an abbreviation
    /// of whatever was on the original label, so "R." and "R.C." identify
    /// the same person even though their edit distance alone wouldn't
    /// clear the similarity threshold.
    fn best_match(&self, key: &str, weights: &SimilarityWeights) -> f64 {
        let stripped_input: String = key.chars().filter(|c| c.is_alphabetic()).collect();

        self.variations
            .iter()
            .map(|v| {
                let stripped_var: String = v.variation_text.chars().filter(|c| c.is_alphabetic()).collect();
                if !stripped_input.is_empty() && stripped_input.eq_ignore_ascii_case(&stripped_var) {
                    return 1.0;
                }
                if self.entity_type == Category::Pessoa && pessoa_identity_match(key, &v.variation_text) {
                    return 1.0;
                }
                combined_score(key, &v.variation_text.to_uppercase(), weights)
            })
            .fold(0.0_f64, f64::max)
    }
}

/// The four operations of spec §4.6.
pub trait CanonicalStore {
    fn find_similar(&self, comparison_key: &str, entity_type: Category, threshold: f64, weights: &SimilarityWeights) -> Option<(CanonicalEntity, f64)>;

    fn upsert(
        &self,
        canonical_name: &str,
        entity_type: Category,
        variation_text: &str,
        association_confidence: f64,
        classification_confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<CanonicalEntity, RecordError>;

    fn all(&self) -> Vec<CanonicalEntity>;

    fn create_schema(&self);
}

#[derive(Debug, Default)]
struct StoreState {
    entities: Vec<CanonicalEntity>,
    next_id: u64,
}

/// Single-writer, mutex-guarded canonical store. All reads and writes go
/// through the same lock, which is what makes §4.6's matching algorithm
/// safe to call from multiple classification workers (spec §5).
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore {
            state: Mutex::new(StoreState::default()),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CanonicalStore for InMemoryStore {
    fn find_similar(&self, comparison_key: &str, entity_type: Category, threshold: f64, weights: &SimilarityWeights) -> Option<(CanonicalEntity, f64)> {
        let state = self.state.lock().expect("canonical store mutex poisoned");

        let mut best: Option<(&CanonicalEntity, f64)> = None;
        for e in state.entities.iter().filter(|e| e.entity_type == entity_type) {
            let score = e.best_match(comparison_key, weights);
            if score < threshold {
                continue;
            }
            match best {
                None => best = Some((e, score)),
                Some((cur, cur_score)) => {
                    if score > cur_score || (score == cur_score && e.created_at < cur.created_at) {
                        best = Some((e, score));
                    }
                }
            }
        }
        best.map(|(e, s)| (e.clone(), s))
    }

    fn upsert(
        &self,
        canonical_name: &str,
        entity_type: Category,
        variation_text: &str,
        association_confidence: f64,
        classification_confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<CanonicalEntity, RecordError> {
        let association_confidence = association_confidence.max(0.70);
        let classification_confidence = classification_confidence.max(0.70);

        let mut state = self.state.lock().expect("canonical store mutex poisoned");

        if let Some(existing) = state
            .entities
            .iter_mut()
            .find(|e| e.canonical_name == canonical_name && e.entity_type == entity_type)
        {
            match existing.variations.iter_mut().find(|v| v.variation_text == variation_text) {
                Some(v) => {
                    v.occurrence_count += 1;
                    v.last_seen = now;
                }
                None => {
                    existing.variations.push(NameVariation {
                        variation_text: variation_text.to_string(),
                        occurrence_count: 1,
                        association_confidence,
                        first_seen: now,
                        last_seen: now,
                    });
                }
            }
            existing.grouping_confidence = existing
                .variations
                .iter()
                .map(|v| v.association_confidence)
                .fold(f64::INFINITY, f64::min);
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = state.next_id;
        state.next_id += 1;

        let entity = CanonicalEntity {
            id,
            canonical_name: canonical_name.to_string(),
            entity_type,
            classification_confidence,
            grouping_confidence: association_confidence,
            variations: vec![NameVariation {
                variation_text: variation_text.to_string(),
                occurrence_count: 1,
                association_confidence,
                first_seen: now,
                last_seen: now,
            }],
            created_at: now,
            updated_at: now,
        };
        state.entities.push(entity.clone());
        Ok(entity)
    }

    fn all(&self) -> Vec<CanonicalEntity> {
        let state = self.state.lock().expect("canonical store mutex poisoned");
        state.entities.clone()
    }

    fn create_schema(&self) {
        // Idempotent by construction: `InMemoryStore::new()` already starts
        // from an empty, correctly-shaped state. A real embedded-database
        // backing would run its CREATE TABLE / CREATE UNIQUE INDEX DDL here.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> SimilarityWeights {
        SimilarityWeights::default()
    }

    #[test]
    fn upsert_creates_new_entity_on_first_insert() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let e = store
            .upsert("Forzza, R.C.", Category::Pessoa, "Forzza, R.C.", 1.0, 0.80, now)
            .unwrap();
        assert_eq!(e.variations.len(), 1);
        assert_eq!(e.grouping_confidence, 1.0);
    }

    #[test]
    fn repeated_identical_variation_increments_count() {
        let store = InMemoryStore::new();
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::seconds(5);
        store
            .upsert("Forzza, R.C.", Category::Pessoa, "Forzza, R.C.", 1.0, 0.80, t1)
            .unwrap();
        let e = store
            .upsert("Forzza, R.C.", Category::Pessoa, "Forzza, R.C.", 1.0, 0.80, t2)
            .unwrap();
        assert_eq!(e.variations.len(), 1);
        assert_eq!(e.variations[0].occurrence_count, 2);
        assert_eq!(e.variations[0].last_seen, t2);
    }

    #[test]
    fn distinct_variation_text_appends_new_variation() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .upsert("Forzza, R.C.", Category::Pessoa, "Forzza, R.C.", 1.0, 0.80, now)
            .unwrap();
        let e = store
            .upsert("Forzza, R.C.", Category::Pessoa, "Forzza, R.", 0.95, 0.80, now)
            .unwrap();
        assert_eq!(e.variations.len(), 2);
    }

    #[test]
    fn grouping_confidence_is_minimum_over_variations() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .upsert("Forzza, R.C.", Category::Pessoa, "Forzza, R.C.", 1.0, 0.80, now)
            .unwrap();
        let e = store
            .upsert("Forzza, R.C.", Category::Pessoa, "Forzza, R.", 0.75, 0.80, now)
            .unwrap();
        assert_eq!(e.grouping_confidence, 0.75);
    }

    #[test]
    fn find_similar_respects_entity_type_and_threshold() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .upsert("EMBRAPA", Category::Empresa, "EMBRAPA", 1.0, 0.85, now)
            .unwrap();
        assert!(store.find_similar("EMBRAPA", Category::Pessoa, 0.70, &weights()).is_none());
        assert!(store.find_similar("EMBRAPA", Category::Empresa, 0.70, &weights()).is_some());
    }

    #[test]
    fn canonical_entity_round_trips_through_json() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let e = store
            .upsert("Forzza, R.C.", Category::Pessoa, "Forzza, R.C.", 1.0, 0.80, now)
            .unwrap();

        let json = serde_json::to_string(&e).unwrap();
        let back: CanonicalEntity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn confidences_are_never_stored_below_threshold() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let e = store
            .upsert("Soares, A.", Category::Pessoa, "Soares, A.", 0.50, 0.60, now)
            .unwrap();
        assert!(e.classification_confidence >= 0.70);
        assert!(e.variations[0].association_confidence >= 0.70);
    }
}
