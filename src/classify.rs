// src/classify.rs
//
// Five-way category assignment with confidence, pattern-driven (spec
// §4.4). Pure and non-suspending; the NER tiebreaker (ner.rs) is a
// separate stage the driver invokes when confidence is low.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Pessoa,
    ConjuntoPessoas,
    GrupoPessoas,
    Empresa,
    NaoDeterminado,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTag {
    ExactUnknown,
    AllCapsToken,
    InstitutionKeyword,
    MultiPersonSeparator,
    RepeatedSurnameInitials,
    EtAlToken,
    SurnameCommaInitials,
    InitialsSurname,
    FullName,
    GroupKeyword,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub raw_text: String,
    pub category: Category,
    pub confidence: f64,
    pub patterns_matched: Vec<PatternTag>,
    pub should_atomize: bool,
}

impl ClassificationResult {
    fn new(raw_text: &str, category: Category, confidence: f64, patterns_matched: Vec<PatternTag>) -> Self {
        ClassificationResult {
            raw_text: raw_text.to_string(),
            category,
            confidence,
            should_atomize: category == Category::ConjuntoPessoas,
            patterns_matched,
        }
    }
}

const INSTITUTION_KEYWORDS: &[&str] = &[
    "embrapa",
    "usp",
    "unicamp",
    "herbário",
    "herbario",
    "jardim botânico",
    "jardim botanico",
    "instituto",
    "universidade",
    "faculdade",
    "inpa",
    "jbrj",
];

const GROUP_KEYWORDS: &[&str] = &["equipe", "grupo", "projeto", "expedição", "expedicao", "pesquisas", "alunos"];

const NAO_DETERMINADO_EXACT: &[&str] = &["?", "sem coletor", "não identificado", "nao identificado", "desconhecido"];

fn et_al_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bet\.?\s*al(ii|\.|\b)").unwrap())
}

fn surname_comma_initials_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Z][\p{L}]+(-[A-Z][\p{L}]+)?,\s*[A-Z]\.([A-Z]\.)*$").unwrap()
    })
}

fn initials_surname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]\.){1,}\s*[A-Z][\p{L}]+(-[A-Z][\p{L}]+)?$").unwrap())
}

// Every token capitalized (connector words like "da"/"de"/"dos" would
// break this, which is deliberate: it keeps group labels like "Pesquisas
// da Biodiversidade" out of the Pessoa rule so GrupoPessoas gets a turn).
// A token may also be a bare middle initial ("C.", "G.") so names like
// "Rafaela C. Forzza" still qualify.
fn full_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\p{Lu}[\p{L}'-]*|\p{Lu}\.)(?:\s+(?:\p{Lu}[\p{L}'-]*|\p{Lu}\.)){1,}$").unwrap())
}

fn all_caps_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{Lu}]{2,}$").unwrap())
}

fn has_strong_separator(s: &str) -> bool {
    s.contains([';', '&', '|'])
}

fn repeated_surname_initials_count(s: &str) -> usize {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"[A-Z][\p{L}]+(-[A-Z][\p{L}]+)?,\s*[A-Z]\.(\s*[A-Z]\.)*").unwrap()
    });
    re.find_iter(s).count()
}

fn is_person_pattern(s: &str) -> bool {
    let trimmed = s.trim();
    surname_comma_initials_regex().is_match(trimmed)
        || initials_surname_regex().is_match(trimmed)
        || full_name_regex().is_match(trimmed)
}

/// Priority 1: exact NaoDeterminado placeholders.
fn try_nao_determinado_exact(raw: &str) -> Option<ClassificationResult> {
    let lowered = raw.trim().to_lowercase();
    if NAO_DETERMINADO_EXACT.contains(&lowered.as_str()) {
        return Some(ClassificationResult::new(
            raw,
            Category::NaoDeterminado,
            1.00,
            vec![PatternTag::ExactUnknown],
        ));
    }
    None
}

/// Priority 2: Empresa — all-caps token, or an institution keyword.
fn try_empresa(raw: &str) -> Option<ClassificationResult> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();

    let mut patterns = Vec::new();
    if !trimmed.contains(' ') && all_caps_token_regex().is_match(trimmed) {
        patterns.push(PatternTag::AllCapsToken);
    }
    if INSTITUTION_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        patterns.push(PatternTag::InstitutionKeyword);
    }

    if patterns.is_empty() {
        return None;
    }
    Some(ClassificationResult::new(raw, Category::Empresa, 0.85, patterns))
}

/// Priority 3: ConjuntoPessoas — separator, repeated surname/initials, or "et al.".
fn try_conjunto_pessoas(raw: &str) -> Option<ClassificationResult> {
    let trimmed = raw.trim();
    let mut patterns = Vec::new();

    if has_strong_separator(trimmed) {
        patterns.push(PatternTag::MultiPersonSeparator);
    }
    if repeated_surname_initials_count(trimmed) >= 2 {
        patterns.push(PatternTag::RepeatedSurnameInitials);
    }
    if et_al_regex().is_match(trimmed) {
        patterns.push(PatternTag::EtAlToken);
    }

    if patterns.is_empty() {
        return None;
    }

    // Confidence bump when each side of a *strong* separator also reads as
    // a person-name pattern on its own. Commas are excluded here even
    // though they can be separators too (§4.3): a bare comma is as likely
    // to sit inside a single "Surname, Initials" unit as between two
    // people, so splitting on it would break apart the very units this
    // check is trying to validate. "et al." is stripped first so a
    // trailing "Surname, Initials et al." segment still reads clean.
    let without_et_al = et_al_regex().replace_all(trimmed, "");
    let sides_are_person_names = without_et_al
        .split([';', '&', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .all(is_person_pattern);

    let confidence = if sides_are_person_names { 0.95 } else { 0.82 };
    Some(ClassificationResult::new(raw, Category::ConjuntoPessoas, confidence, patterns))
}

/// Priority 4: Pessoa — "Surname, Initials", "Initials Surname", or a full name.
fn try_pessoa(raw: &str) -> Option<ClassificationResult> {
    let trimmed = raw.trim();

    if surname_comma_initials_regex().is_match(trimmed) {
        return Some(ClassificationResult::new(
            raw,
            Category::Pessoa,
            0.80,
            vec![PatternTag::SurnameCommaInitials],
        ));
    }
    if initials_surname_regex().is_match(trimmed) {
        return Some(ClassificationResult::new(
            raw,
            Category::Pessoa,
            0.80,
            vec![PatternTag::InitialsSurname],
        ));
    }
    if full_name_regex().is_match(trimmed) {
        return Some(ClassificationResult::new(
            raw,
            Category::Pessoa,
            0.65,
            vec![PatternTag::FullName],
        ));
    }
    None
}

/// Priority 5: GrupoPessoas — group keyword present, no person-name pattern.
fn try_grupo_pessoas(raw: &str) -> Option<ClassificationResult> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();

    if GROUP_KEYWORDS.iter().any(|kw| lowered.contains(kw)) && !is_person_pattern(trimmed) {
        return Some(ClassificationResult::new(
            raw,
            Category::GrupoPessoas,
            0.70,
            vec![PatternTag::GroupKeyword],
        ));
    }
    None
}

/// Rule-based classification (spec §4.4). The first matching rule, in
/// priority order, wins.
pub fn classify_rules(raw: &str) -> ClassificationResult {
    try_nao_determinado_exact(raw)
        .or_else(|| try_empresa(raw))
        .or_else(|| try_conjunto_pessoas(raw))
        .or_else(|| try_pessoa(raw))
        .or_else(|| try_grupo_pessoas(raw))
        .unwrap_or_else(|| ClassificationResult::new(raw, Category::NaoDeterminado, 0.60, vec![PatternTag::Default]))
}
