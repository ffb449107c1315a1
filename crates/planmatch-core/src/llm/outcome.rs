//! Typed results for untrusted model output
//!
//! Every model call in the pipeline goes through [`complete_json`], which
//! never fails: transport errors, timeouts and malformed payloads all come
//! back as [`LlmOutcome::Fallback`] so the call site can substitute its own
//! static default.

use super::{ChatMessage, LLMClient, ResponseFormat};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Either a schema-conforming model answer or the reason it was discarded
#[derive(Debug, Clone, PartialEq)]
pub enum LlmOutcome<T> {
    Parsed(T),
    Fallback(String),
}

impl<T> LlmOutcome<T> {
    /// Apply a validation step; a rejection turns the outcome into a fallback
    pub fn validate<U, F>(self, f: F) -> LlmOutcome<U>
    where
        F: FnOnce(T) -> std::result::Result<U, String>,
    {
        match self {
            LlmOutcome::Parsed(value) => match f(value) {
                Ok(v) => LlmOutcome::Parsed(v),
                Err(reason) => LlmOutcome::Fallback(reason),
            },
            LlmOutcome::Fallback(reason) => LlmOutcome::Fallback(reason),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, LlmOutcome::Parsed(_))
    }

    pub fn parsed(self) -> Option<T> {
        match self {
            LlmOutcome::Parsed(v) => Some(v),
            LlmOutcome::Fallback(_) => None,
        }
    }
}

/// Locate the JSON object in a model response.
///
/// Handles bare JSON, ```json fenced blocks and prose around a single object.
pub fn extract_json(response: &str) -> Option<&str> {
    let body = if let Some(after) = response.split("```json").nth(1) {
        after.split("```").next().unwrap_or(after)
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response)
    } else {
        response
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&body[start..=end])
}

/// Request a JSON completion and decode it into `T`, bounded by `timeout`.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn LLMClient,
    messages: Vec<ChatMessage>,
    timeout: Duration,
    operation: &str,
) -> LlmOutcome<T> {
    let response =
        match tokio::time::timeout(timeout, client.chat_completion(messages, ResponseFormat::Json))
            .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!("{} LLM call failed: {}", operation, e);
                return LlmOutcome::Fallback(format!("LLM call failed: {}", e));
            }
            Err(_) => {
                tracing::warn!("{} LLM call timed out after {:?}", operation, timeout);
                return LlmOutcome::Fallback(format!("LLM call timed out after {:?}", timeout));
            }
        };

    let Some(json_str) = extract_json(&response) else {
        tracing::warn!("{} response contained no JSON object", operation);
        tracing::debug!("Raw LLM response: {}", response);
        return LlmOutcome::Fallback("response contained no JSON object".to_string());
    };

    match serde_json::from_str::<T>(json_str) {
        Ok(value) => LlmOutcome::Parsed(value),
        Err(e) => {
            tracing::warn!("Failed to parse {} JSON: {}", operation, e);
            tracing::debug!("Raw LLM response: {}", response);
            LlmOutcome::Fallback(format!("invalid JSON: {}", e))
        }
    }
}
