// src/utils/similarity.rs
//
// Pure functions over comparison keys (spec §4.1). No suspension points —
// safe to call from any thread, including inside rayon's parallel
// classification stage.

use rphonetic::{Encoder, Metaphone};
use strsim::{jaro_winkler, levenshtein};
use unicode_normalization::UnicodeNormalization;

use crate::config::SimilarityWeights;

/// `1 − levenshtein(s1, s2) / max(|s1|, |s2|)`. Empty-empty yields 1.
pub fn edit_score(s1: &str, s2: &str) -> f64 {
    let len1 = s1.chars().count();
    let len2 = s2.chars().count();
    let max_len = len1.max(len2);
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(s1, s2) as f64 / max_len as f64)
}

/// Standard Jaro-Winkler, prefix weight 0.1, prefix cap 4 — `strsim`'s
/// default behavior.
pub fn jaro_winkler_score(s1: &str, s2: &str) -> f64 {
    jaro_winkler(s1, s2)
}

/// Decompose to NFD and drop every codepoint with a nonzero canonical
/// combining class, i.e. strip diacritics without touching base letters.
/// Kept private to this module: callers never see folded text, only the
/// phonetic code derived from it.
fn ascii_fold(s: &str) -> String {
    s.nfd()
        .filter(|c| unicode_normalization::char::canonical_combining_class(*c) == 0)
        .collect()
}

/// Metaphone code of the ASCII-folded form of `s`.
pub fn phonetic_code(s: &str) -> String {
    let folded = ascii_fold(s);
    Metaphone::default().encode(&folded)
}

/// Equality of the two inputs' phonetic codes, as a {0,1} indicator.
pub fn phonetic_match(s1: &str, s2: &str) -> f64 {
    if phonetic_code(s1) == phonetic_code(s2) {
        1.0
    } else {
        0.0
    }
}

/// Weighted combination of the three subscores (spec §4.1). Weights are
/// assumed pre-validated (`Config::validate`) to sum to 1 and be
/// non-negative.
pub fn combined_score(s1: &str, s2: &str, weights: &SimilarityWeights) -> f64 {
    weights.edit * edit_score(s1, s2)
        + weights.jaro_winkler * jaro_winkler_score(s1, s2)
        + weights.phonetic * phonetic_match(s1, s2)
}
