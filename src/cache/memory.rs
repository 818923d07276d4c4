//! In-process cache backend
//!
//! This module implements the cache backend with an in-memory map. It is
//! suitable for single-instance deployments and tests; multi-instance
//! deployments should use the Redis backend so revocations are shared.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CacheError;

use super::backend::CacheBackend;

/// A stored value with its optional expiry deadline
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

/// In-memory cache backend
///
/// Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.values().filter(|e| !e.is_expired()).count()
    }

    /// Whether the backend holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut state = self.state.write().await;

        match state.get(key) {
            Some(entry) if entry.is_expired() => {
                state.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        state.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        state.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut state = self.state.write().await;

        match state.get(key) {
            Some(entry) if entry.is_expired() => {
                state.remove(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        state.clear();
        Ok(())
    }
}
