//! Filesystem-backed artifact store
//!
//! Layout under the store root:
//!
//! ```text
//! packages/{package}/{version}/manifest.txt
//! packages/{package}/{version}/files/{file_name}
//! cache/{domain}/{sha256(key)}.json
//! ```

use crate::error::{PackyardError, PackyardResult};
use crate::store::{validate_segment, ArtifactStore, CacheEntry};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const MANIFEST_FILE: &str = "manifest.txt";
const FILES_DIR: &str = "files";

/// Artifact store rooted at a directory
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store, creating the root directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> PackyardResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| PackyardError::io(format!("creating store {}", root.display()), e))?;
        debug!("Opened store at {}", root.display());
        Ok(Self { root })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, package: &str, version: &str) -> PackyardResult<PathBuf> {
        validate_segment("package", package)?;
        validate_segment("version", version)?;
        Ok(self.root.join("packages").join(package).join(version))
    }

    fn artifact_path(&self, package: &str, version: &str, file_name: &str) -> PackyardResult<PathBuf> {
        validate_segment("file name", file_name)?;
        Ok(self.version_dir(package, version)?.join(FILES_DIR).join(file_name))
    }

    fn cache_path(&self, domain: &str, key: &str) -> PackyardResult<PathBuf> {
        let mut dir = self.root.join("cache");
        for part in domain.split('/') {
            validate_segment("cache domain", part)?;
            dir.push(part);
        }

        // Keys are arbitrary strings (refs may contain '/'), hash them
        let digest = Sha256::digest(key.as_bytes());
        Ok(dir.join(format!("{}.json", hex::encode(&digest[..16]))))
    }
}

/// Read a file, mapping "not found" to `None`
async fn read_optional(path: &Path) -> PackyardResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PackyardError::io(format!("reading {}", path.display()), e)),
    }
}

/// Write a file through a temporary sibling and rename it into place
async fn write_atomic(path: &Path, data: &[u8]) -> PackyardResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PackyardError::io(format!("creating directory {}", parent.display()), e))?;
    }

    let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp, data)
        .await
        .map_err(|e| PackyardError::io(format!("writing {}", tmp.display()), e))?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(PackyardError::io(format!("renaming into {}", path.display()), e));
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn get_manifest(&self, package: &str, version: &str) -> PackyardResult<Option<String>> {
        let path = self.version_dir(package, version)?.join(MANIFEST_FILE);
        match read_optional(&path).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| PackyardError::StoreCorrupt {
                    path,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn put_manifest(
        &self,
        package: &str,
        version: &str,
        manifest: &str,
    ) -> PackyardResult<()> {
        let path = self.version_dir(package, version)?.join(MANIFEST_FILE);
        write_atomic(&path, manifest.as_bytes()).await
    }

    async fn get_artifact(
        &self,
        package: &str,
        version: &str,
        file_name: &str,
    ) -> PackyardResult<Option<Vec<u8>>> {
        let path = self.artifact_path(package, version, file_name)?;
        read_optional(&path).await
    }

    async fn put_artifact(
        &self,
        package: &str,
        version: &str,
        file_name: &str,
        data: &[u8],
    ) -> PackyardResult<()> {
        let path = self.artifact_path(package, version, file_name)?;
        write_atomic(&path, data).await
    }

    async fn get_cache_entry(&self, domain: &str, key: &str) -> PackyardResult<Option<CacheEntry>> {
        let path = self.cache_path(domain, key)?;
        match read_optional(&path).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| PackyardError::StoreCorrupt {
                    path,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn put_cache_entry(
        &self,
        domain: &str,
        key: &str,
        entry: &CacheEntry,
    ) -> PackyardResult<()> {
        let path = self.cache_path(domain, key)?;
        let content = serde_json::to_vec_pretty(entry)?;
        write_atomic(&path, &content).await
    }
}
