//! Deterministic rewrites used when the model is unavailable

use super::RewriteProblem;
use crate::budget::AgeBand;
use crate::profile::ClientProfile;
use lazy_static::lazy_static;
use regex::Regex;

/// Minimum tokens a stop-word-stripped query must keep
const MIN_REMAINING_TOKENS: usize = 3;

/// Shortest acceptable rewritten query
pub(super) const MIN_QUERY_CHARS: usize = 10;

const STOP_WORDS: &[&str] = &[
    "a", "o", "as", "os", "um", "uma", "uns", "umas", "de", "da", "do", "das", "dos", "em", "no",
    "na", "nos", "nas", "para", "pra", "por", "pelo", "pela", "com", "sem", "e", "ou", "que",
    "ao", "à", "aos", "meu", "minha", "meus", "minhas", "quero", "preciso", "gostaria", "algum",
    "alguma", "qual", "quais", "sobre", "muito", "mais", "bem", "tem", "ter", "é", "seja",
];

/// Domain term → synonym, checked in order
const SYNONYMS: &[(&str, &str)] = &[
    ("plano de saúde", "assistência médica"),
    ("convênio", "plano de saúde"),
    ("barato", "baixo custo"),
    ("preço", "mensalidade"),
    ("mensalidade", "valor mensal"),
    ("hospital", "rede hospitalar"),
    ("consulta", "atendimento ambulatorial"),
    ("cobertura", "rol de procedimentos ANS"),
    ("dentista", "plano odontológico"),
    ("família", "plano familiar"),
    ("idoso", "plano sênior"),
    ("carência", "prazo de carência"),
    ("coparticipação", "franquia"),
];

lazy_static! {
    static ref IDENTIFIER_RES: Vec<Regex> = vec![
        // "código 4412", "registro ANS nº 123.456-7", "cód.: XPTO"
        Regex::new(r"(?i)\b(?:c[óo]digo|c[óo]d\.?|registro(?:\s+ans)?)\s*(?:n[º°o]\.?\s*)?:?\s*[\w.\-/]+").unwrap(),
        // Plan codes such as AM-400, PLN2024, SA_123
        Regex::new(r"\b[A-Za-z]{1,6}[-_/]?\d{2,}[A-Za-z0-9\-]*\b").unwrap(),
        // Bare registration numbers
        Regex::new(r"\b\d{5,}(?:[.\-]\d+)*\b").unwrap(),
    ];
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
}

pub(super) fn fallback_rewrite(
    problem: RewriteProblem,
    query: &str,
    profile: &ClientProfile,
) -> String {
    match problem {
        RewriteProblem::NoResults => strip_stop_words(query),
        RewriteProblem::TooSpecific => strip_identifiers(query),
        RewriteProblem::MissingContext => append_client_context(query, profile),
        RewriteProblem::LowSimilarity => append_synonym(query),
    }
}

fn strip_stop_words(query: &str) -> String {
    let kept: Vec<&str> = query
        .split_whitespace()
        .filter(|token| {
            let bare = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            !bare.is_empty() && !STOP_WORDS.contains(&bare.as_str())
        })
        .collect();

    if kept.len() >= MIN_REMAINING_TOKENS {
        kept.join(" ")
    } else {
        query.to_string()
    }
}

fn strip_identifiers(query: &str) -> String {
    let mut stripped = query.to_string();
    for re in IDENTIFIER_RES.iter() {
        stripped = re.replace_all(&stripped, " ").into_owned();
    }
    let stripped = SPACES_RE.replace_all(stripped.trim(), " ").into_owned();

    if stripped.chars().count() >= MIN_QUERY_CHARS {
        stripped
    } else {
        query.to_string()
    }
}

fn append_client_context(query: &str, profile: &ClientProfile) -> String {
    let lower = query.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();

    for part in [profile.city.as_deref(), profile.state.as_deref()]
        .into_iter()
        .flatten()
    {
        let part = part.trim();
        if !part.is_empty() && !lower.contains(&part.to_lowercase()) {
            tokens.push(part.to_string());
        }
    }

    if let Some(age) = profile.age {
        let label = AgeBand::from_age(age).label();
        if !lower.contains(label) {
            tokens.push(label.to_string());
        }
    }

    if profile.has_dependents() && !lower.contains("familiar") {
        tokens.push("familiar".to_string());
    }

    if tokens.is_empty() {
        query.to_string()
    } else {
        format!("{} {}", query.trim(), tokens.join(" "))
    }
}

fn append_synonym(query: &str) -> String {
    let lower = query.to_lowercase();
    SYNONYMS
        .iter()
        .find(|(term, synonym)| lower.contains(term) && !lower.contains(&synonym.to_lowercase()))
        .map(|(_, synonym)| format!("{} {}", query.trim(), synonym))
        .unwrap_or_else(|| query.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Dependent;

    #[test]
    fn test_strip_stop_words() {
        assert_eq!(
            strip_stop_words("quero um plano de saúde com cobertura para a família"),
            "plano saúde cobertura família"
        );
        // Too few content words left: keep as is
        assert_eq!(strip_stop_words("plano de saúde"), "plano de saúde");
    }

    #[test]
    fn test_strip_identifiers() {
        assert_eq!(
            strip_identifiers("plano AM-400 enfermaria código 7781 São Paulo"),
            "plano enfermaria São Paulo"
        );
        assert_eq!(
            strip_identifiers("registro ANS nº 482.915-3 plano empresarial"),
            "plano empresarial"
        );
        // Nothing meaningful would remain
        assert_eq!(strip_identifiers("PLN2024 SA_123"), "PLN2024 SA_123");
    }

    #[test]
    fn test_append_client_context() {
        let profile = ClientProfile {
            age: Some(35),
            city: Some("Campinas".to_string()),
            state: Some("SP".to_string()),
            dependents: vec![Dependent::default()],
            ..Default::default()
        };
        assert_eq!(
            append_client_context("plano de saúde em Campinas", &profile),
            "plano de saúde em Campinas SP adulto jovem familiar"
        );
        assert_eq!(
            append_client_context("plano de saúde", &ClientProfile::default()),
            "plano de saúde"
        );
    }

    #[test]
    fn test_append_synonym() {
        assert_eq!(
            append_synonym("convênio barato"),
            "convênio barato plano de saúde"
        );
        assert_eq!(
            append_synonym("plano de saúde assistência médica barato"),
            "plano de saúde assistência médica barato baixo custo"
        );
        assert_eq!(append_synonym("xyz"), "xyz");
    }
}
