//! Session cache for the authentication core
//!
//! Three independent namespaces over one key/value backend:
//! - `user:{email}` — resolved-user snapshots that short-circuit database
//!   reads, stored as a versioned JSON envelope with a bounded TTL
//! - `blacklist:token:{token}` — markers for access tokens revoked before
//!   natural expiry, stored with the token's remaining lifetime as TTL
//! - `password_changed:{email}` — RFC 3339 timestamp of the account's last
//!   password reset, stored without expiry
//!
//! The cache is advisory, never the system of record. Every operation
//! degrades to a safe default when the backend is unreachable; in
//! particular the blacklist check fails open (see `is_token_blacklisted`).

pub mod backend;
pub mod memory;
pub mod redis;

pub use self::backend::CacheBackend;
pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::CurrentUser;

/// Key prefix for resolved-user snapshots
const USER_KEY_PREFIX: &str = "user:";

/// Key prefix for blacklisted access tokens
const BLACKLIST_KEY_PREFIX: &str = "blacklist:token:";

/// Key prefix for password-change timestamps
const PASSWORD_CHANGE_KEY_PREFIX: &str = "password_changed:";

/// Version of the cached user envelope
///
/// Bump when `CurrentUser` fields change; older entries then read as misses
/// instead of deserializing into the wrong shape.
const USER_CACHE_VERSION: u32 = 1;

/// Versioned envelope for cached user snapshots
#[derive(Debug, Serialize, Deserialize)]
struct CachedUser {
    v: u32,
    user: CurrentUser,
}

/// Hit/miss counters for the user-snapshot namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of user-snapshot cache hits
    pub hits: u64,
    /// Number of user-snapshot cache misses
    pub misses: u64,
}

impl CacheStats {
    /// Calculates the hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Session cache over an injected backend
///
/// Constructed once at the composition root and shared by reference; tests
/// substitute a fake backend through the same constructor.
pub struct SessionCache {
    backend: Arc<dyn CacheBackend>,
    user_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SessionCache {
    /// Default TTL for cached user snapshots
    pub const DEFAULT_USER_TTL: Duration = Duration::from_secs(900);

    /// Create a session cache with the default user-snapshot TTL
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_user_ttl(backend, Self::DEFAULT_USER_TTL)
    }

    /// Create a session cache with an explicit user-snapshot TTL
    ///
    /// The TTL bounds the staleness window if an explicit invalidation is
    /// ever lost.
    pub fn with_user_ttl(backend: Arc<dyn CacheBackend>, user_ttl: Duration) -> Self {
        Self {
            backend,
            user_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn user_key(email: &str) -> String {
        format!("{}{}", USER_KEY_PREFIX, email)
    }

    fn blacklist_key(token: &str) -> String {
        format!("{}{}", BLACKLIST_KEY_PREFIX, token)
    }

    fn password_change_key(email: &str) -> String {
        format!("{}{}", PASSWORD_CHANGE_KEY_PREFIX, email)
    }

    /// Look up a cached user snapshot
    ///
    /// Any failure — backend unreachable, undecodable payload, version
    /// mismatch — reads as a miss and falls through to persistent storage.
    pub async fn get_cached_user(&self, email: &str) -> Option<CurrentUser> {
        let key = Self::user_key(email);

        match self.backend.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<CachedUser>(&raw) {
                Ok(entry) if entry.v == USER_CACHE_VERSION => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(email = %email, "User cache hit");
                    Some(entry.user)
                }
                Ok(entry) => {
                    debug!(
                        email = %email,
                        found = entry.v,
                        expected = USER_CACHE_VERSION,
                        "Dropping cached user with stale shape version"
                    );
                    let _ = self.backend.delete(&key).await;
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    None
                }
                Err(e) => {
                    warn!(email = %email, error = %e, "Undecodable user cache entry, treating as miss");
                    let _ = self.backend.delete(&key).await;
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(email = %email, "User cache miss");
                None
            }
            Err(e) => {
                warn!(email = %email, error = %e, "User cache read failed, treating as miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a resolved-user snapshot
    pub async fn set_cached_user(&self, email: &str, user: &CurrentUser) {
        let entry = CachedUser {
            v: USER_CACHE_VERSION,
            user: user.clone(),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(email = %email, error = %e, "Failed to serialize user for cache");
                return;
            }
        };

        if let Err(e) = self
            .backend
            .set(&Self::user_key(email), &raw, Some(self.user_ttl))
            .await
        {
            warn!(email = %email, error = %e, "Failed to cache user");
        } else {
            debug!(email = %email, ttl_secs = self.user_ttl.as_secs(), "User cached");
        }
    }

    /// Drop the cached snapshot for an account
    ///
    /// Called after every mutation that changes what a resolved user looks
    /// like. A failed delete is tolerated: the entry's own TTL bounds how
    /// long the stale snapshot can survive.
    pub async fn invalidate_user(&self, email: &str) {
        if let Err(e) = self.backend.delete(&Self::user_key(email)).await {
            warn!(email = %email, error = %e, "Failed to invalidate user cache entry");
        } else {
            debug!(email = %email, "User cache invalidated");
        }
    }

    /// Record an access token as revoked for `ttl`
    ///
    /// The TTL must be at least the token's remaining lifetime so the
    /// marker outlives every copy of the token.
    pub async fn blacklist_token(&self, token: &str, ttl: Duration) {
        if let Err(e) = self
            .backend
            .set(&Self::blacklist_key(token), "1", Some(ttl))
            .await
        {
            warn!(error = %e, "Failed to blacklist token");
        }
    }

    /// Check whether an access token has been revoked
    ///
    /// Fails OPEN: an unreachable backend answers `false`, so a previously
    /// blacklisted token passes while the cache is down. This favors
    /// availability over revocation strictness and is recorded as a
    /// deliberate trade-off in DESIGN.md.
    pub async fn is_token_blacklisted(&self, token: &str) -> bool {
        match self.backend.exists(&Self::blacklist_key(token)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Blacklist check failed, failing open");
                false
            }
        }
    }

    /// Record the current instant as the account's last password change
    ///
    /// Stored without expiry; every access token issued before this instant
    /// is rejected by the authentication core.
    pub async fn record_password_change(&self, email: &str) {
        let stamp = Utc::now().to_rfc3339();
        if let Err(e) = self
            .backend
            .set(&Self::password_change_key(email), &stamp, None)
            .await
        {
            warn!(email = %email, error = %e, "Failed to record password change");
        }
    }

    /// When the account's password was last changed, if known
    ///
    /// Backend failure or an unparseable stamp reads as absent.
    pub async fn password_change_time(&self, email: &str) -> Option<DateTime<Utc>> {
        match self.backend.get(&Self::password_change_key(email)).await {
            Ok(Some(raw)) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(stamp) => Some(stamp.with_timezone(&Utc)),
                Err(e) => {
                    warn!(email = %email, error = %e, "Unparseable password-change timestamp");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(email = %email, error = %e, "Password-change lookup failed, treating as absent");
                None
            }
        }
    }

    /// Wipe every namespace
    ///
    /// Administrative/test use only.
    pub async fn flush_all(&self) {
        if let Err(e) = self.backend.flush().await {
            warn!(error = %e, "Failed to flush cache");
        }
    }

    /// Hit/miss counters for the user-snapshot namespace
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
