use crate::profile::ClientProfile;
use crate::search::FusedDocument;

/// Characters of each document shown to the grader
const DOC_PREVIEW_CHARS: usize = 1200;

pub(super) const SYSTEM_PROMPT: &str =
    "Você avalia a relevância de documentos de planos de saúde para um cliente. \
     Responda SOMENTE com JSON válido no formato \
     {\"grades\": [{\"documentId\": \"...\", \"score\": \"relevant\" | \"partially_relevant\" | \"irrelevant\", \
     \"reason\": \"10 a 300 caracteres\", \"confidence\": 0.0-1.0, \"missingInfo\": [\"...\"]}]}";

pub(super) fn build_grading_prompt(batch: &[FusedDocument], profile: &ClientProfile) -> String {
    let mut prompt = format!(
        r#"Perfil do cliente:
{}

Classifique cada documento abaixo:
- "relevant": atende diretamente o perfil (região, faixa etária, orçamento, dependentes ou condições)
- "partially_relevant": útil, mas incompleto ou genérico
- "irrelevant": não ajuda a recomendar um plano para este cliente

Documentos:
"#,
        profile.prompt_summary()
    );

    for doc in batch {
        let meta = &doc.document.metadata;
        let mut header = format!("[{}]", doc.id());
        if let Some(ref operator) = meta.operator {
            header.push_str(&format!(" operadora={}", operator));
        }
        if let Some(ref code) = meta.plan_code {
            header.push_str(&format!(" plano={}", code));
        }
        prompt.push_str(&header);
        prompt.push('\n');
        prompt.push_str(truncate_chars(&doc.document.content, DOC_PREVIEW_CHARS));
        prompt.push_str("\n\n");
    }

    prompt.push_str("Inclua uma entrada por documentId. Responda apenas com o JSON:");
    prompt
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
