//! Credential resolution: cache first, then the introspection authority.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::cache::{CacheLookup, CredentialCache};
use crate::auth::introspection::{IntrospectionClient, IntrospectionError, IntrospectionResult};
use crate::config::schema::CacheConfig;

/// Resolves a raw bearer credential to an introspection result.
///
/// The authority is never called while any cache lock is held; concurrent
/// misses on one credential may each call the authority and the last write
/// wins.
#[derive(Clone)]
pub struct CredentialResolver {
    client: IntrospectionClient,
    cache: Option<CredentialCache>,
}

impl CredentialResolver {
    pub fn new(client: IntrospectionClient, cache: Option<CredentialCache>) -> Self {
        Self { client, cache }
    }

    /// Build from config; a disabled cache means every call goes to the authority.
    pub fn from_config(client: IntrospectionClient, config: &CacheConfig) -> Self {
        let cache = config
            .enabled
            .then(|| CredentialCache::new(Duration::from_secs(config.ttl_secs)));
        Self::new(client, cache)
    }

    /// Return the introspection result for `token`.
    ///
    /// Active results are cached; inactive results and errors never are.
    pub async fn resolve(&self, token: &str) -> Result<Arc<IntrospectionResult>, IntrospectionError> {
        let Some(cache) = &self.cache else {
            return self.client.introspect(token).await.map(Arc::new);
        };

        if let CacheLookup::Hit(result) = cache.get(token) {
            tracing::trace!("Token cache hit");
            return Ok(result);
        }

        let result = Arc::new(self.client.introspect(token).await?);
        if let Some(expires_at) = cache.insert(token, result.clone()) {
            tracing::debug!(
                subject = result.subject().unwrap_or("-"),
                cached_for = ?expires_at.saturating_duration_since(std::time::Instant::now()),
                "Cached introspection result"
            );
        }
        Ok(result)
    }

    pub fn cache(&self) -> Option<&CredentialCache> {
        self.cache.as_ref()
    }
}
