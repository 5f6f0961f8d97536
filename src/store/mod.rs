//! Artifact store
//!
//! Persists three kinds of entries:
//!
//! | Key | Value | Mutability |
//! |-----|-------|------------|
//! | (package, version) | build manifest text | written once |
//! | (package, version, file name) | artifact bytes | written once |
//! | (domain, key) | cache entry with fetch time | refreshed on expiry |
//!
//! Reads of never-written keys return `None`. Writes overwrite
//! unconditionally; builds for a fixed version are deterministic, so a
//! repeated write of a manifest or artifact stores identical content.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::error::{PackyardError, PackyardResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value and the time it was fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached value
    pub value: serde_json::Value,

    /// When the value was fetched from its source
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry fetched now
    pub fn now(value: serde_json::Value) -> Self {
        Self {
            value,
            fetched_at: Utc::now(),
        }
    }

    /// Whether the entry is younger than `max_age`
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        match (Utc::now() - self.fetched_at).to_std() {
            Ok(age) => age < max_age,
            // Fetched "in the future": clock moved backwards
            Err(_) => true,
        }
    }
}

/// Key-value persistence for manifests, artifacts and cache entries
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Read the build manifest of (package, version)
    async fn get_manifest(&self, package: &str, version: &str) -> PackyardResult<Option<String>>;

    /// Write the build manifest of (package, version)
    async fn put_manifest(&self, package: &str, version: &str, manifest: &str)
        -> PackyardResult<()>;

    /// Read one artifact
    async fn get_artifact(
        &self,
        package: &str,
        version: &str,
        file_name: &str,
    ) -> PackyardResult<Option<Vec<u8>>>;

    /// Write one artifact
    async fn put_artifact(
        &self,
        package: &str,
        version: &str,
        file_name: &str,
        data: &[u8],
    ) -> PackyardResult<()>;

    /// Read a generic cache entry
    async fn get_cache_entry(&self, domain: &str, key: &str) -> PackyardResult<Option<CacheEntry>>;

    /// Write a generic cache entry
    async fn put_cache_entry(&self, domain: &str, key: &str, entry: &CacheEntry)
        -> PackyardResult<()>;
}

/// Validate that a name is safe to use as a path component and shell argument.
///
/// Allows ASCII alphanumerics and `-`, `_`, `.`, `@`, `+`.
pub fn validate_segment(kind: &'static str, value: &str) -> PackyardResult<()> {
    let invalid = |reason: &str| PackyardError::InvalidName {
        kind,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value == "." || value.contains("..") {
        return Err(invalid("must not be '.' or contain '..'"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '+'))
    {
        return Err(invalid(
            "must contain only alphanumeric characters or '-', '_', '.', '@', '+'",
        ));
    }
    Ok(())
}
