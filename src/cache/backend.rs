//! Cache backend trait
//!
//! This module defines the key/value store interface the session cache is
//! built on. Implementations can use various storage backends like an
//! in-process map or Redis.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;

/// Trait for cache backends
///
/// A plain string key/value store with optional per-entry expiry. The
/// backend may live across a network connection that can be unavailable at
/// any time; implementations surface failures as errors and the session
/// cache converts them to safe defaults.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the name of this cache backend
    fn name(&self) -> &str;

    /// Retrieves a value by key
    ///
    /// Returns `Ok(Some(value))` if found, `Ok(None)` if not found or
    /// expired, or an error if the operation failed.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores a value with an optional time-to-live
    ///
    /// If an entry with the same key exists, it will be overwritten.
    /// `ttl: None` stores the value without expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Deletes a value by key
    ///
    /// Returns `Ok(())` even if the entry doesn't exist.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Checks whether a key exists and is not expired
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Deletes every entry
    async fn flush(&self) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: MockCacheBackend can be created and used
    #[tokio::test]
    async fn test_mock_backend_get() {
        let mut mock = MockCacheBackend::new();

        mock.expect_name().return_const("mock".to_string());
        mock.expect_get()
            .with(mockall::predicate::eq("missing"))
            .returning(|_| Ok(None));

        assert_eq!(mock.name(), "mock");
        let result = mock.get("missing").await;
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    // Test 2: MockCacheBackend set and exists
    #[tokio::test]
    async fn test_mock_backend_set_exists() {
        let mut mock = MockCacheBackend::new();

        mock.expect_set().returning(|_, _, _| Ok(()));
        mock.expect_exists()
            .with(mockall::predicate::eq("present"))
            .returning(|_| Ok(true));

        assert!(mock
            .set("present", "1", Some(Duration::from_secs(60)))
            .await
            .is_ok());
        assert!(mock.exists("present").await.unwrap());
    }

    // Test 3: MockCacheBackend propagates failures
    #[tokio::test]
    async fn test_mock_backend_failure() {
        let mut mock = MockCacheBackend::new();

        mock.expect_get()
            .returning(|_| Err(CacheError::Unavailable("connection refused".to_string())));

        let result = mock.get("any").await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }
}
