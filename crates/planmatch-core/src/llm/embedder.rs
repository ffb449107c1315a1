//! Text embedding
//!
//! Queries and plan passages are embedded by the same E5-style model, which
//! expects a `query: ` or `passage: ` prefix so both land in one space.

use super::LLMClient;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Turns text into vectors for similarity search
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a search query
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed corpus passages, one vector per input in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint
pub struct HttpEmbedder {
    client: Arc<dyn LLMClient>,
}

impl HttpEmbedder {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&format!("query: {}", text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let passages: Vec<String> = texts.iter().map(|t| format!("passage: {}", t)).collect();
        self.client.embed_batch(&passages).await
    }

    fn dimensions(&self) -> usize {
        self.client.embedding_dimensions()
    }

    fn model_name(&self) -> &str {
        self.client.model_name()
    }
}
