// src/utils/atomize.rs
//
// Splits a multi-person string into individual name atoms (spec §4.3).
// Only ever called when the classifier has already decided the input is
// `ConjuntoPessoas`.

use regex::Regex;
use std::sync::OnceLock;

use crate::classify::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Semicolon,
    Ampersand,
    EtAl,
    Comma,
    Pipe,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomizedName {
    pub text: String,
    pub position: usize,
    pub separator_used: Separator,
    pub parent_raw_text: String,
}

fn et_al_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bet\.?\s*al(ii|\.|\b)").unwrap())
}

/// `"Surname, Initials"` repeated at least twice, to promote bare commas
/// between full name units to separators.
fn surname_initials_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Z][\p{L}]+(-[A-Z][\p{L}]+)?,\s*[A-Z]\.(\s*[A-Z]\.)*").unwrap()
    })
}

fn digit_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn strip_collection_numbers(s: &str) -> String {
    let cleaned = digit_run_regex().replace_all(s, "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Does `s` look like at least two "Surname, Initials" units joined by
/// commas? Used to decide whether a bare comma is a weak separator.
fn has_repeated_surname_initials(s: &str) -> bool {
    surname_initials_regex().find_iter(s).count() >= 2
}

fn strong_separator_for(c: char) -> Separator {
    match c {
        ';' => Separator::Semicolon,
        '&' => Separator::Ampersand,
        '|' => Separator::Pipe,
        _ => unreachable!("only called for strong separator chars"),
    }
}

/// Split on any mix of the strong separators (`;`, `&`, `|`) in a single
/// left-to-right pass, recording which specific separator preceded each
/// atom. A string can legitimately mix separator kinds (e.g.
/// `"A & B; C"`), so this does not pick just one kind up front.
fn split_strong(s: &str, parent: &str) -> Vec<AtomizedName> {
    let mut parts: Vec<(String, Separator)> = Vec::new();
    let mut start = 0usize;
    let mut pending_sep = Separator::None;

    for (idx, ch) in s.char_indices() {
        if matches!(ch, ';' | '&' | '|') {
            let part = s[start..idx].trim();
            if !part.is_empty() {
                parts.push((part.to_string(), pending_sep));
            }
            pending_sep = strong_separator_for(ch);
            start = idx + ch.len_utf8();
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        parts.push((tail.to_string(), pending_sep));
    }

    parts
        .into_iter()
        .enumerate()
        .map(|(i, (text, sep))| AtomizedName {
            text: strip_collection_numbers(&text),
            position: i,
            separator_used: if i == 0 { Separator::None } else { sep },
            parent_raw_text: parent.to_string(),
        })
        .collect()
}

fn split_on(s: &str, sep: char, separator: Separator, parent: &str) -> Vec<AtomizedName> {
    s.split(sep)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .enumerate()
        .map(|(i, part)| AtomizedName {
            text: strip_collection_numbers(part),
            position: i,
            separator_used: if i == 0 { Separator::None } else { separator },
            parent_raw_text: parent.to_string(),
        })
        .collect()
}

/// Split `text` into atoms if `category` is `ConjuntoPessoas`; otherwise
/// returns an empty sequence.
pub fn atomize(text: &str, category: Category) -> Vec<AtomizedName> {
    if category != Category::ConjuntoPessoas {
        return Vec::new();
    }

    // 1) "et al." drops the substring and everything after it on that segment.
    let without_et_al = if let Some(m) = et_al_regex().find(text) {
        &text[..m.start()]
    } else {
        text
    };
    let trimmed = without_et_al.trim_end_matches([' ', ',', ';', '&', '|']).trim();

    if trimmed.is_empty() {
        return Vec::new();
    }

    // 2-4) Strong separators: any mix of `;`, `&`, `|` in one pass.
    if trimmed.contains([';', '&', '|']) {
        return split_strong(trimmed, text);
    }

    // 5) Weak separator: comma, only between repeated "Surname, Initials" units.
    if trimmed.contains(',') && has_repeated_surname_initials(trimmed) {
        return split_on(trimmed, ',', Separator::Comma, text);
    }

    // No recognized separator within the segment itself (e.g. a bare
    // "et al." tail, or a single remaining person): treat as one atom.
    vec![AtomizedName {
        text: strip_collection_numbers(trimmed),
        position: 0,
        separator_used: Separator::None,
        parent_raw_text: text.to_string(),
    }]
}
