//! LLM integration
//!
//! Provides traits and implementations for:
//! - Chat completions against OpenAI-compatible services (vLLM, OpenAI, etc.)
//! - Embedding generation
//! - Tolerant JSON extraction from model output

mod cache;
mod client;
mod embedder;
mod outcome;

pub use cache::{CacheKey, CacheStats, CachedValue, LLMCache};
pub use client::{ChatMessage, LLMClient, MetricsSnapshot, ResponseFormat, VLLMClient};
pub use embedder::{Embedder, HttpEmbedder};
pub use outcome::{complete_json, extract_json, LlmOutcome};
