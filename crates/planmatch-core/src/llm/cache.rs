//! In-process memo of model responses
//!
//! Identical chat requests (same model, same messages) and embeddings of the
//! same text are answered from memory until they expire. The cache is bounded;
//! when full, expired entries are dropped first and then the oldest entry.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_CAPACITY: usize = 4096;

/// What a cached response answers
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey<'a> {
    Chat { model: &'a str, messages: &'a str },
    Embedding { model: &'a str, text: &'a str },
}

impl CacheKey<'_> {
    fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// A cached response body
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Text(String),
    Vector(Vec<f32>),
}

struct Entry {
    value: CachedValue,
    inserted_at: Instant,
}

/// Bounded TTL cache shared by one client
pub struct LLMCache {
    entries: Mutex<HashMap<u64, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl LLMCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(DEFAULT_CAPACITY, ttl)
    }

    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &CacheKey<'_>) -> Option<CachedValue> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(&key.digest())?;
        (entry.inserted_at.elapsed() < self.ttl).then(|| entry.value.clone())
    }

    pub fn get_text(&self, key: &CacheKey<'_>) -> Option<String> {
        match self.get(key)? {
            CachedValue::Text(text) => Some(text),
            CachedValue::Vector(_) => None,
        }
    }

    pub fn get_vector(&self, key: &CacheKey<'_>) -> Option<Vec<f32>> {
        match self.get(key)? {
            CachedValue::Vector(vector) => Some(vector),
            CachedValue::Text(_) => None,
        }
    }

    pub fn insert(&self, key: &CacheKey<'_>, value: CachedValue) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        if entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        }
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(digest, _)| *digest);
            if let Some(digest) = oldest {
                entries.remove(&digest);
            }
        }

        entries.insert(
            key.digest(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let Ok(entries) = self.entries.lock() else {
            return CacheStats::default();
        };
        let expired = entries
            .values()
            .filter(|e| e.inserted_at.elapsed() >= self.ttl)
            .count();
        CacheStats {
            entries: entries.len(),
            expired,
            capacity: self.capacity,
        }
    }
}

impl Default for LLMCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(messages: &str) -> CacheKey<'_> {
        CacheKey::Chat {
            model: "m",
            messages,
        }
    }

    #[test]
    fn test_text_and_vector_round_trip() {
        let cache = LLMCache::new();
        cache.insert(&chat("a"), CachedValue::Text("resposta".to_string()));
        let embed = CacheKey::Embedding {
            model: "m",
            text: "a",
        };
        cache.insert(&embed, CachedValue::Vector(vec![0.5, 0.25]));

        assert_eq!(cache.get_text(&chat("a")), Some("resposta".to_string()));
        assert_eq!(cache.get_vector(&embed), Some(vec![0.5, 0.25]));
        assert_eq!(cache.get_vector(&chat("a")), None);
        assert_eq!(cache.get_text(&chat("b")), None);
    }

    #[test]
    fn test_expiry_and_purge() {
        let cache = LLMCache::with_ttl(Duration::from_millis(30));
        cache.insert(&chat("a"), CachedValue::Text("x".to_string()));
        cache.insert(&chat("b"), CachedValue::Text("y".to_string()));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get_text(&chat("a")), None);
        assert_eq!(cache.stats().expired, 2);
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = LLMCache::with_limits(2, DEFAULT_TTL);
        cache.insert(&chat("a"), CachedValue::Text("1".to_string()));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(&chat("b"), CachedValue::Text("2".to_string()));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(&chat("c"), CachedValue::Text("3".to_string()));

        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.get_text(&chat("a")), None);
        assert_eq!(cache.get_text(&chat("c")), Some("3".to_string()));
    }
}
