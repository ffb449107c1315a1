//! In-memory vector store
//!
//! Brute-force cosine search over pre-embedded documents. Suitable for
//! small corpora, fixtures and the CLI; production deployments plug their
//! own [`VectorSearch`] backend in.

use super::{CorpusScope, DocumentType, SearchDocument, VectorSearch};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored document with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub document: SearchDocument,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Brute-force vector index held in memory
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    documents: Vec<IndexedDocument>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<IndexedDocument>) -> Self {
        Self { documents }
    }

    pub fn insert(&mut self, document: SearchDocument, embedding: Vec<f32>) {
        self.documents.push(IndexedDocument {
            document,
            embedding,
        });
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All file ids (falling back to document ids) present in the store
    pub fn scope(&self) -> CorpusScope {
        CorpusScope::new(self.documents.iter().map(|d| {
            d.document
                .metadata
                .file_id
                .clone()
                .unwrap_or_else(|| d.document.id.clone())
        }))
    }
}

#[async_trait]
impl VectorSearch for InMemoryVectorStore {
    async fn search(
        &self,
        embedding: &[f32],
        type_filter: Option<&[DocumentType]>,
        scope: &CorpusScope,
        top_k: usize,
    ) -> Result<Vec<SearchDocument>> {
        let mut hits: Vec<SearchDocument> = self
            .documents
            .iter()
            .filter(|d| scope.contains(&d.document))
            .filter(|d| DocumentType::admits(type_filter, d.document.metadata.document_type))
            .map(|d| {
                let mut hit = d.document.clone();
                hit.score = cosine_similarity(embedding, &d.embedding) as f64;
                hit
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }
}

/// Cosine similarity; 0.0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
