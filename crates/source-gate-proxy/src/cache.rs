// crates/source-gate-proxy/src/cache.rs
// ============================================================================
// Module: Authorization Cache
// Description: Short-lived cache of positive per-source decisions.
// Purpose: Skip repeat ownership calls for the same token and source.
// Dependencies: sha2, source-gate-query
// ============================================================================

//! ## Overview
//! The cache remembers that a token was granted read access to a source. It
//! stores only positive outcomes, keyed by a SHA-256 fingerprint of the
//! `Authorization` header so raw tokens are never held. Each entry expires at
//! the earlier of the configured TTL and the token's own expiry, and the map
//! is bounded: inserts first purge expired entries, then evict the entry
//! closest to expiry. A poisoned lock degrades to a cache miss.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;

use sha2::Digest;
use sha2::Sha256;
use source_gate_query::SourceId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Cache key: token fingerprint plus source identifier.
type CacheKey = ([u8; 32], SourceId);

/// TTL-bounded cache of positive authorization decisions.
pub struct AuthorizationCache {
    /// Upper bound on entry lifetime.
    ttl: Duration,
    /// Maximum number of live entries.
    max_entries: usize,
    /// Entries mapped to their expiry instant.
    entries: Mutex<HashMap<CacheKey, Instant>>,
}

impl AuthorizationCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when a live grant exists for the token and source.
    #[must_use]
    pub fn is_allowed(&self, authorization: &str, source_id: &SourceId) -> bool {
        self.allowed_at(&key_for(authorization, source_id), Instant::now())
    }

    /// Records a grant for the token and source.
    ///
    /// Grants for tokens already past `token_expires_at` are dropped.
    pub fn record_allowed(
        &self,
        authorization: &str,
        source_id: &SourceId,
        token_expires_at: Option<SystemTime>,
    ) {
        let token_remaining = match token_expires_at {
            Some(expiry) => match expiry.duration_since(SystemTime::now()) {
                Ok(remaining) => Some(remaining),
                Err(_) => return,
            },
            None => None,
        };
        self.insert_at(key_for(authorization, source_id), Instant::now(), token_remaining);
    }

    /// Returns the number of stored entries, live or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Returns true when no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `key` as of `now`, dropping it when expired.
    fn allowed_at(&self, key: &CacheKey, now: Instant) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        match entries.get(key) {
            Some(expiry) if *expiry > now => true,
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        }
    }

    /// Inserts `key` as of `now`, bounded by the TTL and the token lifetime.
    fn insert_at(&self, key: CacheKey, now: Instant, token_remaining: Option<Duration>) {
        if self.max_entries == 0 {
            return;
        }
        let lifetime = token_remaining.map_or(self.ttl, |remaining| remaining.min(self.ttl));
        if lifetime.is_zero() {
            return;
        }
        let expiry = now + lifetime;
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry_expiry| *entry_expiry > now);
            if entries.len() >= self.max_entries {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, entry_expiry)| **entry_expiry)
                    .map(|(entry_key, _)| entry_key.clone());
                if let Some(soonest) = soonest {
                    entries.remove(&soonest);
                }
            }
        }
        entries.insert(key, expiry);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the cache key for a header value and source.
fn key_for(authorization: &str, source_id: &SourceId) -> CacheKey {
    (Sha256::digest(authorization.as_bytes()).into(), source_id.clone())
}
