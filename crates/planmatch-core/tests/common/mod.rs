//! Shared in-process doubles for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use planmatch_core::llm::ResponseFormat;
use planmatch_core::{
    ChatMessage, CorpusScope, DocumentMetadata, DocumentType, Embedder, InMemoryVectorStore,
    LLMClient, PlanMatchError, Result, SearchDocument, VectorSearch,
};
use serde_json::json;
use std::sync::Mutex;

/// Which component issued a chat completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Plan,
    Grade,
    Rewrite,
    Unknown,
}

fn classify(messages: &[ChatMessage]) -> CallKind {
    let system = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .unwrap_or("");
    if system.contains("gera consultas") {
        CallKind::Plan
    } else if system.contains("avalia a relevância") {
        CallKind::Grade
    } else if system.contains("reescreve consultas") {
        CallKind::Rewrite
    } else {
        CallKind::Unknown
    }
}

/// Document ids listed in a grading prompt (`[id] ...` headers)
fn prompt_document_ids(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .filter_map(|line| line.strip_prefix('['))
        .filter_map(|rest| rest.split(']').next())
        .map(str::to_string)
        .collect()
}

/// Scripted model: plans fixed queries, grades by id prefix, rewrites by suffix
pub struct ScriptedLlm {
    /// Ids starting with any of these are graded irrelevant
    pub irrelevant_prefixes: Vec<String>,
    /// Fail every call of these kinds
    pub failing: Vec<CallKind>,
    calls: Mutex<Vec<CallKind>>,
}

impl ScriptedLlm {
    pub fn new(irrelevant_prefixes: &[&str]) -> Self {
        Self {
            irrelevant_prefixes: irrelevant_prefixes.iter().map(|p| p.to_string()).collect(),
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kinds: &[CallKind]) -> Self {
        Self {
            failing: kinds.to_vec(),
            ..Self::new(&[])
        }
    }

    pub fn calls(&self, kind: CallKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|k| **k == kind)
            .count()
    }

    fn plan_reply(&self) -> String {
        json!({
            "queries": [
                {"query": "plano de saúde adulto em São Paulo", "focus": "profile", "priority": 1},
                {"query": "cobertura hospitalar e rede credenciada", "focus": "coverage", "priority": 3},
                {"query": "mensalidade até R$ 800 por faixa etária", "focus": "price", "priority": 2}
            ]
        })
        .to_string()
    }

    fn grade_reply(&self, prompt: &str) -> String {
        let grades: Vec<_> = prompt_document_ids(prompt)
            .into_iter()
            .map(|id| {
                let irrelevant = self.irrelevant_prefixes.iter().any(|p| id.starts_with(p));
                json!({
                    "documentId": id,
                    "score": if irrelevant { "irrelevant" } else { "relevant" },
                    "reason": if irrelevant {
                        "Documento não trata do perfil do cliente"
                    } else {
                        "Plano compatível com o perfil do cliente"
                    },
                    "confidence": 0.9
                })
            })
            .collect();
        json!({ "grades": grades }).to_string()
    }

    fn rewrite_reply(&self, prompt: &str) -> String {
        let original = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Consulta original: "))
            .unwrap_or("plano de saúde")
            .trim_matches('"');
        json!({
            "rewrittenQuery": format!("{} com rede credenciada ampla", original),
            "reasoning": "ampliar a busca"
        })
        .to_string()
    }
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        _format: ResponseFormat,
    ) -> Result<String> {
        let kind = classify(&messages);
        self.calls.lock().unwrap().push(kind);

        if self.failing.contains(&kind) {
            return Err(PlanMatchError::Llm(format!("{:?} unavailable", kind)));
        }

        let user = messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        match kind {
            CallKind::Plan => Ok(self.plan_reply()),
            CallKind::Grade => Ok(self.grade_reply(user)),
            CallKind::Rewrite => Ok(self.rewrite_reply(user)),
            CallKind::Unknown => Ok("sem resposta".to_string()),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

const VOCABULARY: &[&str] = &[
    "plano",
    "saúde",
    "são paulo",
    "cobertura",
    "hospitalar",
    "rede",
    "mensalidade",
    "faixa",
    "odonto",
    "carência",
];

/// Bag-of-keywords embedder; the trailing constant keeps vectors non-zero
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = VOCABULARY
            .iter()
            .map(|w| lower.matches(w).count() as f32)
            .collect();
        v.push(1.0);
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len() + 1
    }

    fn model_name(&self) -> &str {
        "keywords"
    }
}

fn doc(
    id: &str,
    doc_type: Option<DocumentType>,
    operator: Option<&str>,
    content: &str,
) -> SearchDocument {
    SearchDocument {
        id: id.to_string(),
        content: content.to_string(),
        score: 0.0,
        metadata: DocumentMetadata {
            document_type: doc_type,
            operator: operator.map(str::to_string),
            file_id: Some(format!("{}.md", id)),
            ..DocumentMetadata::default()
        },
    }
}

/// Small São Paulo plan corpus
pub fn sao_paulo_corpus() -> Vec<SearchDocument> {
    vec![
        doc(
            "geral-guia",
            Some(DocumentType::General),
            None,
            "Guia geral de plano de saúde em São Paulo: carência, cobertura hospitalar e rede \
             credenciada. Operadoras como Amil e Bradesco Saúde atuam na capital.",
        ),
        doc(
            "amil-essencial",
            Some(DocumentType::Product),
            Some("Amil"),
            "Plano Amil Essencial com cobertura hospitalar em São Paulo.\n\n\
             | Plano | Operadora | 0-18 | 19-38 | 39-59 | 60-75 | 76+ |\n\
             |---|---|---|---|---|---|---|\n\
             | Amil Essencial | Amil | R$ 320,00 | R$ 650,00 | R$ 980,00 | R$ 1.450,00 | R$ 2.100,00 |\n",
        ),
        doc(
            "bradesco-top",
            Some(DocumentType::Product),
            Some("Bradesco Saúde"),
            "Plano Bradesco Top com rede hospitalar premium em São Paulo.\n\n\
             | Bradesco Top | Bradesco | R$ 900,00 | R$ 1.350,00 | R$ 2.000,00 | R$ 3.100,00 | R$ 4.200,00 |\n",
        ),
        doc(
            "sulamerica-rede",
            Some(DocumentType::Operator),
            Some("SulAmérica"),
            "SulAmérica: rede credenciada de hospitais e laboratórios em São Paulo, sem tabela de \
             mensalidade publicada.",
        ),
        doc(
            "odonto-sorriso",
            Some(DocumentType::Product),
            Some("OdontoPrev"),
            "Plano odonto Sorriso: limpeza, restauração e ortodontia. Carência de 90 dias.",
        ),
        doc(
            "legado-faixa",
            None,
            None,
            "Tabela antiga por faixa etária de plano de saúde, mensalidade base.\n\
             | Hapvida Mix | Hapvida | R$ 410,00 |\n",
        ),
    ]
}

pub fn store_with(documents: Vec<SearchDocument>) -> InMemoryVectorStore {
    let mut store = InMemoryVectorStore::new();
    for document in documents {
        let embedding = KeywordEmbedder::vector(&document.content);
        store.insert(document, embedding);
    }
    store
}

/// Store whose searches fail for one query's embedding
pub struct FlakySearch {
    store: InMemoryVectorStore,
    broken: Vec<f32>,
}

impl FlakySearch {
    pub fn new(store: InMemoryVectorStore, broken_query: &str) -> Self {
        Self {
            store,
            broken: KeywordEmbedder::vector(broken_query),
        }
    }
}

#[async_trait]
impl VectorSearch for FlakySearch {
    async fn search(
        &self,
        embedding: &[f32],
        type_filter: Option<&[DocumentType]>,
        scope: &CorpusScope,
        top_k: usize,
    ) -> Result<Vec<SearchDocument>> {
        if embedding == self.broken.as_slice() {
            return Err(PlanMatchError::Search("shard offline".to_string()));
        }
        self.store.search(embedding, type_filter, scope, top_k).await
    }
}
