//! Carrier (operadora) recognition and name normalization

use super::SearchDocument;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Carrier names as they appear in plan documents, spelling variants included
pub const KNOWN_OPERATORS: &[&str] = &[
    "Amil",
    "Bradesco Saúde",
    "Bradesco",
    "SulAmérica",
    "Sul América",
    "Unimed",
    "Hapvida",
    "NotreDame Intermédica",
    "Notre Dame Intermédica",
    "NotreDame",
    "Notre Dame",
    "Intermédica",
    "Porto Seguro Saúde",
    "Porto Seguro",
    "Golden Cross",
    "Prevent Senior",
    "Allianz Saúde",
    "Allianz",
    "Care Plus",
    "Omint",
    "MedSênior",
    "Assim Saúde",
    "São Cristóvão Saúde",
    "Santa Helena Saúde",
];

/// Canonical keys for carriers known under several names
const OPERATOR_ALIASES: &[(&str, &str)] = &[
    ("notredameintermedica", "notredame"),
    ("intermedica", "notredame"),
    ("gndi", "notredame"),
    ("portoseguro", "porto"),
];

lazy_static! {
    static ref OPERATOR_RE: Regex = {
        let mut variants: Vec<String> = KNOWN_OPERATORS
            .iter()
            .map(|name| regex::escape(&fold(name)))
            .collect();
        // Longest first so "bradesco saude" wins over "bradesco"
        variants.sort_by_key(|v| std::cmp::Reverse(v.len()));
        variants.dedup();
        Regex::new(&format!(r"\b(?:{})\b", variants.join("|"))).unwrap()
    };
}

/// Lowercase and strip diacritics
fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Canonical carrier key: "SulAmérica" → "sulamerica", "Notre Dame" → "notredame"
pub fn normalize_operator(name: &str) -> String {
    let compact: String = fold(name).chars().filter(|c| c.is_alphanumeric()).collect();

    let base = match compact.strip_suffix("saude") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => compact,
    };

    OPERATOR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == base)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(base)
}

/// Carriers mentioned by a set of documents, as canonical keys.
///
/// Reads structured metadata first, then scans content for known names.
pub fn extract_operators(documents: &[SearchDocument]) -> BTreeSet<String> {
    let mut found = BTreeSet::new();

    for doc in documents {
        if let Some(operator) = doc.metadata.operator.as_deref() {
            let key = normalize_operator(operator);
            if !key.is_empty() {
                found.insert(key);
            }
        }

        let folded = fold(&doc.content);
        for m in OPERATOR_RE.find_iter(&folded) {
            found.insert(normalize_operator(m.as_str()));
        }
    }

    found
}
