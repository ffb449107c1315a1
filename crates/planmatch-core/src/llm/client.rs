//! HTTP client for external LLM services (vLLM, OpenAI, etc.)

use super::cache::{CacheKey, CachedValue, LLMCache};
use crate::config::LLMServiceConfig;
use crate::error::{PlanMatchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Output format requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        format: ResponseFormat,
    ) -> Result<String>;

    /// Generate embeddings for text
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(PlanMatchError::Embedding(format!(
            "{} does not serve embeddings",
            self.model_name()
        )))
    }

    /// Generate embeddings for multiple texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Get embedding dimensions
    fn embedding_dimensions(&self) -> usize {
        0
    }

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
struct APIMetrics {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl APIMetrics {
    fn error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
}

/// vLLM/OpenAI-compatible client
pub struct VLLMClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    embedding_dimensions: usize,
    cache: Arc<LLMCache>,
    metrics: Arc<APIMetrics>,
}

impl VLLMClient {
    /// Create new vLLM client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let embedding_dimensions = config.embedding_dimensions.unwrap_or(384);

        Ok(Self {
            http_client,
            config,
            embedding_dimensions,
            cache: Arc::new(LLMCache::new()),
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LLMServiceConfig::default())
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        let hits = self.metrics.cache_hits.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: self.metrics.cache_misses.load(Ordering::Relaxed),
            cache_hit_rate: if total > 0 {
                hits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    fn record_latency(&self, start: Instant) {
        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);
    }
}

#[async_trait]
impl LLMClient for VLLMClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        format: ResponseFormat,
    ) -> Result<String> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let messages_json = serde_json::to_string(&messages)?;
        let cache_key = CacheKey::Chat {
            model: &self.config.model,
            messages: &messages_json,
        };

        if let Some(cached) = self.cache.get_text(&cache_key) {
            tracing::debug!("Cache hit for chat completion");
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }

        self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct ResponseFormatBody {
            #[serde(rename = "type")]
            kind: &'static str,
        }

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<ResponseFormatBody>,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: 1024,
            response_format: match format {
                ResponseFormat::Json => Some(ResponseFormatBody {
                    kind: "json_object",
                }),
                ResponseFormat::Text => None,
            },
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let req = self.authorized(self.http_client.post(&url).json(&request));

        let response = req.send().await.map_err(|e| {
            self.metrics.error();
            PlanMatchError::Http(e)
        })?;

        if !response.status().is_success() {
            self.metrics.error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlanMatchError::ExternalError(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            self.metrics.error();
            PlanMatchError::Http(e)
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                self.metrics.error();
                PlanMatchError::Llm("No response from LLM".to_string())
            })?
            .message
            .content;

        self.cache.insert(&cache_key, CachedValue::Text(content.clone()));
        self.record_latency(start);

        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| PlanMatchError::Embedding("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut uncached_indices = Vec::new();
        let mut uncached_texts = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cache_key = CacheKey::Embedding {
                model: &self.config.embedding_model,
                text,
            };
            match self.cache.get_vector(&cache_key) {
                Some(embedding) => {
                    self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
                    results[i] = Some(embedding);
                }
                None => {
                    uncached_indices.push(i);
                    uncached_texts.push(text.clone());
                }
            }
        }

        if !uncached_texts.is_empty() {
            self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);

            #[derive(Serialize)]
            struct EmbedRequest {
                model: String,
                input: Vec<String>,
            }

            #[derive(Deserialize)]
            struct EmbedResponse {
                data: Vec<EmbedData>,
            }

            #[derive(Deserialize)]
            struct EmbedData {
                embedding: Vec<f32>,
            }

            let request = EmbedRequest {
                model: self.config.embedding_model.clone(),
                input: uncached_texts.clone(),
            };

            let url = format!("{}/v1/embeddings", self.config.embeddings_url());
            let req = self.authorized(self.http_client.post(&url).json(&request));

            let response = req.send().await.map_err(|e| {
                self.metrics.error();
                PlanMatchError::Http(e)
            })?;

            if !response.status().is_success() {
                self.metrics.error();
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(PlanMatchError::ExternalError(format!(
                    "Embedding service error (HTTP {}): {}",
                    status, body
                )));
            }

            let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                self.metrics.error();
                PlanMatchError::Http(e)
            })?;

            for (i, data) in embed_response.data.into_iter().enumerate() {
                let Some(&original_idx) = uncached_indices.get(i) else {
                    break;
                };
                let cache_key = CacheKey::Embedding {
                    model: &self.config.embedding_model,
                    text: &uncached_texts[i],
                };
                self.cache
                    .insert(&cache_key, CachedValue::Vector(data.embedding.clone()));
                results[original_idx] = Some(data.embedding);
            }
        }

        self.record_latency(start);

        results
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                self.metrics.error();
                PlanMatchError::Embedding(
                    "Embedding service returned fewer vectors than inputs".to_string(),
                )
            })
    }

    fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
