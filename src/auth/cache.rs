//! Introspection result caching.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::auth::introspection::IntrospectionResult;
use crate::observability::metrics;

/// A cached introspection result and the instant it stops being usable.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: Arc<IntrospectionResult>,
    pub expires_at: Instant,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Arc<IntrospectionResult>),
    Miss,
    /// An entry existed but had expired; it has been removed.
    Expired,
}

/// A thread-safe cache of introspection results keyed by raw credential.
///
/// Backed by a sharded map so unrelated credentials never contend on one lock.
/// Entries are only ever replaced, never updated in place, and expired entries
/// are dropped lazily by the lookup that finds them.
#[derive(Clone)]
pub struct CredentialCache {
    inner: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl CredentialCache {
    /// Create an empty cache with the given reuse ceiling.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Look up a credential.
    pub fn get(&self, token: &str) -> CacheLookup {
        self.get_at(token, Instant::now())
    }

    /// Look up a credential as of `now`.
    pub fn get_at(&self, token: &str, now: Instant) -> CacheLookup {
        let expired = match self.inner.get(token) {
            Some(entry) if entry.expires_at > now => {
                metrics::record_cache_lookup("hit");
                return CacheLookup::Hit(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            // Another request may have stored a fresh entry since the read.
            self.inner.remove_if(token, |_, entry| entry.expires_at <= now);
            metrics::record_cache_size(self.inner.len());
            metrics::record_cache_lookup("expired");
            CacheLookup::Expired
        } else {
            metrics::record_cache_lookup("miss");
            CacheLookup::Miss
        }
    }

    /// Store an active result. Inactive results are never cached.
    ///
    /// Returns the expiry used, or `None` if nothing was stored.
    pub fn insert(&self, token: &str, result: Arc<IntrospectionResult>) -> Option<Instant> {
        self.insert_at(token, result, Instant::now(), SystemTime::now())
    }

    /// Store an active result as of (`now`, `wall_now`).
    pub fn insert_at(
        &self,
        token: &str,
        result: Arc<IntrospectionResult>,
        now: Instant,
        wall_now: SystemTime,
    ) -> Option<Instant> {
        if !result.is_active() {
            return None;
        }

        let expires_at = self.expiry_for(&result, now, wall_now);
        if expires_at <= now {
            return None;
        }

        self.inner.insert(
            token.to_string(),
            CacheEntry { result, expires_at },
        );
        metrics::record_cache_size(self.inner.len());
        Some(expires_at)
    }

    /// The sooner of `now + ttl` and the credential's own expiry.
    pub fn expiry_for(&self, result: &IntrospectionResult, now: Instant, wall_now: SystemTime) -> Instant {
        let ceiling = now + self.ttl;
        let Some(exp) = result.expires_at() else {
            return ceiling;
        };

        // Compared at full wall-clock precision so the entry never outlives `exp`
        let token_expiry = UNIX_EPOCH + Duration::from_secs(exp.max(0) as u64);
        let remaining = token_expiry.duration_since(wall_now).unwrap_or(Duration::ZERO);
        ceiling.min(now + remaining)
    }

    /// Number of stored entries, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
