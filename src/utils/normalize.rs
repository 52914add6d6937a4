// src/utils/normalize.rs
//
// Produces a comparison key and a display form from a single name string
// (spec §4.2). Never called on a multi-person aggregate — the atomizer
// (utils::atomize) runs first for those.

use regex::Regex;
use std::sync::OnceLock;

use crate::classify::Category;

/// Rule tags recorded on a `NormalizedName`, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationRule {
    StripLeadingPunctuation,
    CollapseInteriorWhitespace,
    SpaceAfterPunctuation,
    ScrubEtAl,
    DropTrailingDigits,
    UpperCase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    pub display_form: String,
    pub comparison_key: String,
    pub rules_applied: Vec<NormalizationRule>,
}

/// Why a name could not be turned into a comparison key (spec §4.2).
/// The driver reclassifies the atom as `NaoDeterminado` at confidence 0.70
/// when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnfitForCanonicalization;

fn et_al_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bet\.?\s*al(ii|\.|\b)").unwrap())
}

fn trailing_digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+$").unwrap())
}

fn leading_punct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\s;,.&|]+").unwrap())
}

fn punct_no_space_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*([,;.&])\s*").unwrap())
}

/// Count alphabetic characters (Unicode-aware) in `s`.
fn alpha_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_alphabetic()).count()
}

/// A "name component" for the genericity check: a maximal alphabetic run.
fn name_component_count(s: &str) -> usize {
    s.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .count()
}

fn has_punctuation(s: &str) -> bool {
    s.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

/// Build the comparison key per the ordered rules in spec §4.2, or signal
/// that the input is unfit for canonicalization.
pub fn comparison_key(raw: &str) -> Result<(String, Vec<NormalizationRule>), UnfitForCanonicalization> {
    let mut applied = Vec::new();

    // 1) Strip leading punctuation and whitespace runs.
    let mut s = leading_punct_regex().replace(raw, "").into_owned();
    applied.push(NormalizationRule::StripLeadingPunctuation);

    // 2) Collapse interior whitespace to single spaces.
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    applied.push(NormalizationRule::CollapseInteriorWhitespace);

    // 3) Insert a single space after `, ; . &`, removing whitespace before them.
    s = punct_no_space_regex().replace_all(&s, "$1 ").into_owned();
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    applied.push(NormalizationRule::SpaceAfterPunctuation);

    // 4) Remove any "et al." family token from any position.
    let before = s.len();
    s = et_al_regex().replace_all(&s, "").into_owned();
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.len() != before {
        applied.push(NormalizationRule::ScrubEtAl);
    }

    // 5) Discard trailing digit groups attached to name tokens. A digit
    // group standing alone as the *first* token (e.g. a collector record
    // number prefixed before the name) is left in place so the
    // leading-digit rejection check below can catch it.
    let before = s.len();
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let mut cleaned: Vec<String> = Vec::with_capacity(tokens.len());
    for (i, tok) in tokens.iter().enumerate() {
        if i == 0 {
            cleaned.push((*tok).to_string());
            continue;
        }
        let stripped = trailing_digits_regex().replace(tok, "").into_owned();
        if !stripped.is_empty() {
            cleaned.push(stripped);
        }
    }
    s = cleaned.join(" ");
    if s.len() != before {
        applied.push(NormalizationRule::DropTrailingDigits);
    }

    // 6) Upper-case the result.
    let key = s.to_uppercase();
    applied.push(NormalizationRule::UpperCase);

    // Rejection checks.
    if key.is_empty() {
        return Err(UnfitForCanonicalization);
    }
    if key.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(UnfitForCanonicalization);
    }
    if alpha_count(&key) < 3 {
        return Err(UnfitForCanonicalization);
    }
    if !has_punctuation(&key) && name_component_count(&key) < 2 {
        return Err(UnfitForCanonicalization);
    }

    Ok((key, applied))
}

/// Cleanup applied to the display form: whitespace, stray leading
/// punctuation, and any "et al." token. Accents, internal case, and
/// formatting are otherwise preserved verbatim.
fn clean_display(raw: &str) -> String {
    let s = leading_punct_regex().replace(raw, "").into_owned();
    let s = et_al_regex().replace_all(&s, "").into_owned();
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a single-person atom into display form + comparison key.
pub fn normalize(raw: &str) -> Result<NormalizedName, UnfitForCanonicalization> {
    let (comparison_key, rules_applied) = comparison_key(raw)?;
    Ok(NormalizedName {
        display_form: clean_display(raw),
        comparison_key,
        rules_applied,
    })
}

fn is_initials_token(tok: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\p{Lu}\.)+$").unwrap()).is_match(tok)
}

fn title_case_component(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let upper: String = first.to_uppercase().collect();
            let rest: String = chars.flat_map(|c| c.to_lowercase()).collect();
            format!("{upper}{rest}")
        }
    }
}

/// Title-case a surname, preserving hyphenated multi-component surnames
/// as one token per component (spec §4.4).
fn title_case_surname(surname: &str) -> String {
    surname.split('-').map(title_case_component).collect::<Vec<_>>().join("-")
}

fn first_letter_initial(tok: &str) -> String {
    match tok.chars().next() {
        Some(c) => {
            let upper: String = c.to_uppercase().collect();
            format!("{upper}.")
        }
        None => String::new(),
    }
}

/// Reduce an already-abbreviated given-names segment (`"T. M."`, `"D.R."`)
/// to upper-case, preserving its original token spacing. A token with no
/// dot (a full given name spelled out, e.g. `"TIAGO"`) is reduced to its
/// first letter plus a dot.
fn preserve_initials_spacing(given: &str) -> String {
    given
        .split_whitespace()
        .map(|tok| if tok.contains('.') { tok.to_uppercase() } else { first_letter_initial(tok) })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a sequence of full given-name tokens to concatenated initials
/// with no separating space (`["Alisson", "Nogueira"]` -> `"A.N."`).
fn concatenated_initials(tokens: &[&str]) -> String {
    tokens.iter().map(|t| first_letter_initial(t)).collect()
}

/// Pessoa canonical display: always reordered to "Surname, Initials"
/// (spec §4.4).
fn pessoa_canonical_form(display_form: &str) -> String {
    let trimmed = display_form.trim();

    if let Some(comma_idx) = trimmed.find(',') {
        let surname = title_case_surname(trimmed[..comma_idx].trim());
        let given = preserve_initials_spacing(trimmed[comma_idx + 1..].trim());
        return format!("{surname}, {given}");
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 2 {
        return trimmed.to_string();
    }

    let mut leading_initials = 0;
    while leading_initials < tokens.len() - 1 && is_initials_token(tokens[leading_initials]) {
        leading_initials += 1;
    }

    if leading_initials > 0 {
        let given = preserve_initials_spacing(&tokens[..leading_initials].join(" "));
        let surname = title_case_surname(&tokens[leading_initials..].join(" "));
        return format!("{surname}, {given}");
    }

    let surname = title_case_surname(tokens[tokens.len() - 1]);
    let given = concatenated_initials(&tokens[..tokens.len() - 1]);
    format!("{surname}, {given}")
}

/// Canonical display form per category (spec §4.4): `Pessoa` is reordered
/// to "Surname, Initials"; `Empresa`/`GrupoPessoas` are upper-cased;
/// `NaoDeterminado` is left exactly as given. Only consulted when a new
/// canonical entity is created — later variations keep their own observed
/// spelling and never rename an existing entity.
pub fn canonical_display(display_form: &str, category: Category) -> String {
    match category {
        Category::Pessoa => pessoa_canonical_form(display_form),
        Category::Empresa | Category::GrupoPessoas => display_form.to_uppercase(),
        Category::ConjuntoPessoas | Category::NaoDeterminado => display_form.to_string(),
    }
}

/// Split a Pessoa-shaped string into `(surname, initials)`, both reduced to
/// bare upper-case letters — no punctuation, no spacing artifacts from
/// whichever branch of `pessoa_canonical_form` produced them.
fn pessoa_components(text: &str) -> (String, String) {
    let canonical = pessoa_canonical_form(text);
    let mut parts = canonical.splitn(2, ',');
    let surname: String = parts.next().unwrap_or("").chars().filter(|c| c.is_alphabetic()).collect::<String>().to_uppercase();
    let initials: String = parts.next().unwrap_or("").chars().filter(|c| c.is_alphabetic()).collect::<String>().to_uppercase();
    (surname, initials)
}

/// Whether two Pessoa-shaped strings identify the same person for
/// clustering purposes (spec §4.6 step 3): same surname, and one's
/// initials are a prefix of the other's. A record giving only `"R."` is
/// treated as the same person as one giving the fuller `"R.C."` — initials
/// are inherently an abbreviation of whatever was written on the label, so
/// a shorter one is never treated as contradicting a longer one that
/// extends it. Word order and spacing are irrelevant here; both inputs are
/// reordered and stripped to bare letters by `pessoa_components` first, so
/// `"Forzza, R.C."`, `"R.C. Forzza"`, and `"Rafaela C. Forzza"` all collapse
/// to the same `("FORZZA", "RC")` pair.
pub fn pessoa_identity_match(a: &str, b: &str) -> bool {
    let (surname_a, initials_a) = pessoa_components(a);
    let (surname_b, initials_b) = pessoa_components(b);
    !surname_a.is_empty() && surname_a == surname_b && (initials_a.starts_with(&initials_b) || initials_b.starts_with(&initials_a))
}

/// Raw-input guard run before classification (spec §8 scenario 8): a
/// record whose raw text begins with a digit or a separator character, or
/// that is a single bare lowercase word, is rejected outright rather than
/// processed and reclassified. This is narrower but stricter than
/// `comparison_key`'s own `UnfitForCanonicalization` check, which still
/// reclassifies as `NaoDeterminado` and upserts (§4.2) — that path also
/// covers a bare *capitalized* single word (e.g. a surname with no
/// initials, `"Kumerrow"`), which is kept and can still cluster
/// phonetically under `NaoDeterminado`. Only the lowercase case reads as
/// noise rather than a plausible (if under-specified) name, and acronym
/// input (`"EMBRAPA"`) never reaches this branch since it isn't lowercase
/// either. The caller must check for an exact `NaoDeterminado` placeholder
/// first — `"?"` on its own would otherwise fail the alphabetic-count
/// check here.
pub fn is_structurally_rejected(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return true;
    }
    if trimmed.starts_with([';', '|', '&', ',']) {
        return true;
    }
    if alpha_count(trimmed) < 3 {
        return true;
    }
    if !trimmed.contains(char::is_whitespace) && !has_punctuation(trimmed) {
        if let Some(first) = trimmed.chars().next() {
            if first.is_lowercase() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_interior_whitespace() {
        let (key, _) = comparison_key("Forzza,   R.C.").unwrap();
        assert!(!key.contains("  "));
    }

    #[test]
    fn et_al_is_scrubbed() {
        let (key, rules) = comparison_key("Botelho, R.D. ET. AL.").unwrap();
        assert!(!key.to_lowercase().contains("al"));
        assert!(rules.contains(&NormalizationRule::ScrubEtAl));
    }

    #[test]
    fn trailing_digits_dropped() {
        let (key, _) = comparison_key("Santo 410").unwrap();
        assert_eq!(key, "SANTO");
    }

    #[test]
    fn comparison_key_is_upper_case_and_trimmed() {
        let (key, _) = comparison_key("  Forzza, R.C.  ").unwrap();
        assert_eq!(key, key.to_uppercase());
        assert!(!key.starts_with(' '));
        assert!(!key.ends_with(' '));
    }

    #[test]
    fn leading_digits_rejected() {
        assert!(comparison_key("13313, A.C.B.").is_err());
    }

    #[test]
    fn leading_pipe_rejected() {
        assert!(comparison_key("|Amanda, A.").is_err());
    }

    #[test]
    fn single_lowercase_word_rejected() {
        assert!(comparison_key("soares").is_err());
    }

    #[test]
    fn surname_comma_initials_accepted() {
        assert!(comparison_key("Soares, A.").is_ok());
    }

    #[test]
    fn display_form_preserves_accents_and_case() {
        let n = normalize("Guimarães, T. M.").unwrap();
        assert_eq!(n.display_form, "Guimarães, T. M.");
    }

    #[test]
    fn display_form_scrubs_et_al() {
        let n = normalize("Botelho, R.D. ET. AL.").unwrap();
        assert_eq!(n.display_form, "Botelho, R.D.");
    }

    #[test]
    fn canonical_display_surname_comma_initials_is_preserved() {
        assert_eq!(canonical_display("Guimarães, T. M.", Category::Pessoa), "Guimarães, T. M.");
        assert_eq!(canonical_display("Forzza, R.C.", Category::Pessoa), "Forzza, R.C.");
    }

    #[test]
    fn canonical_display_reorders_initials_surname() {
        assert_eq!(canonical_display("D.R. Gonzaga", Category::Pessoa), "Gonzaga, D.R.");
    }

    #[test]
    fn canonical_display_abbreviates_full_name() {
        assert_eq!(canonical_display("Alisson Nogueira Braz", Category::Pessoa), "Braz, A.N.");
    }

    #[test]
    fn canonical_display_handles_full_given_name_plus_middle_initial() {
        assert_eq!(canonical_display("Débora G. Takaki", Category::Pessoa), "Takaki, D.G.");
    }

    #[test]
    fn canonical_display_reduces_spelled_out_given_name() {
        assert_eq!(canonical_display("Grespan, TIAGO", Category::Pessoa), "Grespan, T.");
    }

    #[test]
    fn canonical_display_upper_cases_empresa_and_grupo() {
        assert_eq!(canonical_display("EMBRAPA", Category::Empresa), "EMBRAPA");
        assert_eq!(canonical_display("Pesquisas da Biodiversidade", Category::GrupoPessoas), "PESQUISAS DA BIODIVERSIDADE");
    }

    #[test]
    fn canonical_display_leaves_nao_determinado_unchanged() {
        assert_eq!(canonical_display("sem coletor", Category::NaoDeterminado), "sem coletor");
    }

    #[test]
    fn pessoa_identity_match_is_order_invariant() {
        assert!(pessoa_identity_match("Forzza, R.C.", "R.C. Forzza"));
        assert!(pessoa_identity_match("Forzza, R.C.", "Rafaela C. Forzza"));
    }

    #[test]
    fn pessoa_identity_match_accepts_a_shorter_initials_prefix() {
        assert!(pessoa_identity_match("Forzza, R.C.", "Forzza, R."));
        assert!(pessoa_identity_match("Forzza, R.", "Forzza, R.C."));
    }

    #[test]
    fn pessoa_identity_match_rejects_different_surnames() {
        assert!(!pessoa_identity_match("Forzza, R.C.", "Silva, R.C."));
    }

    #[test]
    fn pessoa_identity_match_rejects_incompatible_initials() {
        assert!(!pessoa_identity_match("Silva, J.", "Silva, M."));
    }

    #[test]
    fn structural_guard_rejects_leading_digit_leading_pipe_and_bare_lowercase_word() {
        assert!(is_structurally_rejected("13313, A.C.B."));
        assert!(is_structurally_rejected("|Amanda, A."));
        assert!(is_structurally_rejected("soares"));
    }

    #[test]
    fn structural_guard_allows_all_caps_acronym() {
        assert!(!is_structurally_rejected("EMBRAPA"));
    }

    #[test]
    fn structural_guard_allows_bare_capitalized_surname() {
        assert!(!is_structurally_rejected("Kumerrow"));
    }

    #[test]
    fn structural_guard_allows_ordinary_person_and_group_strings() {
        assert!(!is_structurally_rejected("Forzza, R.C."));
        assert!(!is_structurally_rejected("Silva, J. & R.C. Forzza; Santos, M. et al."));
        assert!(!is_structurally_rejected("Pesquisas da Biodiversidade"));
    }
}
