//! Time-bounded cache over the artifact store

use crate::error::PackyardResult;
use crate::store::{ArtifactStore, CacheEntry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Get-or-fetch cache whose entries expire after a caller-chosen age
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn ArtifactStore>,
}

impl TtlCache {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Return the cached value for (domain, key) if younger than `max_age`,
    /// otherwise run `fetch`, store its result and return it.
    ///
    /// Fetch errors are returned as-is and nothing is stored.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        domain: &str,
        key: &str,
        max_age: Duration,
        fetch: F,
    ) -> PackyardResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = PackyardResult<T>>,
    {
        if let Some(entry) = self.store.get_cache_entry(domain, key).await? {
            if entry.is_fresh(max_age) {
                match serde_json::from_value(entry.value) {
                    Ok(value) => {
                        debug!("Cache hit {}/{}", domain, key);
                        return Ok(value);
                    }
                    Err(e) => warn!("Discarding unreadable cache entry {}/{}: {}", domain, key, e),
                }
            } else {
                debug!("Cache entry {}/{} expired", domain, key);
            }
        }

        let value = fetch().await?;
        let entry = CacheEntry::now(serde_json::to_value(&value)?);
        self.store.put_cache_entry(domain, key, &entry).await?;
        debug!("Cached {}/{}", domain, key);
        Ok(value)
    }
}
