//! In-memory artifact store
//!
//! Used for `serve --ephemeral` and in tests. Contents are lost on exit.

use crate::error::PackyardResult;
use crate::store::{ArtifactStore, CacheEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

type VersionKey = (String, String);
type ArtifactKey = (String, String, String);

/// Artifact store backed by hash maps
#[derive(Default)]
pub struct MemoryStore {
    manifests: RwLock<HashMap<VersionKey, String>>,
    artifacts: RwLock<HashMap<ArtifactKey, Vec<u8>>>,
    cache: RwLock<HashMap<VersionKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop one artifact (simulates a store that lost data)
    pub async fn remove_artifact(&self, package: &str, version: &str, file_name: &str) -> bool {
        self.artifacts
            .write()
            .await
            .remove(&(package.to_string(), version.to_string(), file_name.to_string()))
            .is_some()
    }

    /// Number of stored artifacts
    pub async fn artifact_count(&self) -> usize {
        self.artifacts.read().await.len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn get_manifest(&self, package: &str, version: &str) -> PackyardResult<Option<String>> {
        let key = (package.to_string(), version.to_string());
        Ok(self.manifests.read().await.get(&key).cloned())
    }

    async fn put_manifest(
        &self,
        package: &str,
        version: &str,
        manifest: &str,
    ) -> PackyardResult<()> {
        let key = (package.to_string(), version.to_string());
        self.manifests.write().await.insert(key, manifest.to_string());
        Ok(())
    }

    async fn get_artifact(
        &self,
        package: &str,
        version: &str,
        file_name: &str,
    ) -> PackyardResult<Option<Vec<u8>>> {
        let key = (
            package.to_string(),
            version.to_string(),
            file_name.to_string(),
        );
        Ok(self.artifacts.read().await.get(&key).cloned())
    }

    async fn put_artifact(
        &self,
        package: &str,
        version: &str,
        file_name: &str,
        data: &[u8],
    ) -> PackyardResult<()> {
        let key = (
            package.to_string(),
            version.to_string(),
            file_name.to_string(),
        );
        self.artifacts.write().await.insert(key, data.to_vec());
        Ok(())
    }

    async fn get_cache_entry(&self, domain: &str, key: &str) -> PackyardResult<Option<CacheEntry>> {
        let key = (domain.to_string(), key.to_string());
        Ok(self.cache.read().await.get(&key).cloned())
    }

    async fn put_cache_entry(
        &self,
        domain: &str,
        key: &str,
        entry: &CacheEntry,
    ) -> PackyardResult<()> {
        let key = (domain.to_string(), key.to_string());
        self.cache.write().await.insert(key, entry.clone());
        Ok(())
    }
}
