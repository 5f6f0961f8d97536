//! Resolution of package requests to stored artifacts
//!
//! Turns `(package, version, path)` into artifact bytes:
//!
//! 1. `latest` becomes a concrete version
//! 2. The version and package are checked against the upstream listings
//! 3. The manifest is read from the store, or built on a miss
//! 4. The requested (or primary) file is read from the store

mod version;

pub use version::{PackageRef, RequestedVersion, LATEST};

use crate::build::{extract_file_name, BuildManifest, PackageBuilder};
use crate::cache::BuildCoalescer;
use crate::config::LatestPolicy;
use crate::error::{PackyardError, PackyardResult};
use crate::store::{validate_segment, ArtifactStore};
use crate::upstream::VersionResolver;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One artifact ready to be served
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub package: String,
    pub version: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Front door for every package request
pub struct Resolver {
    versions: VersionResolver,
    store: Arc<dyn ArtifactStore>,
    builder: Arc<dyn PackageBuilder>,
    coalescer: BuildCoalescer,
}

impl Resolver {
    pub fn new(
        versions: VersionResolver,
        store: Arc<dyn ArtifactStore>,
        builder: Arc<dyn PackageBuilder>,
    ) -> Self {
        Self {
            versions,
            store,
            builder,
            coalescer: BuildCoalescer::new(),
        }
    }

    /// Translate a requested version into the concrete cache key
    pub async fn concrete_version(&self, requested: &RequestedVersion) -> PackyardResult<String> {
        match requested {
            RequestedVersion::Latest => self.versions.resolve_latest().await,
            RequestedVersion::Concrete(v) => Ok(v.clone()),
        }
    }

    /// Reject unknown versions and packages before anything gets built
    async fn check_exists(&self, package: &str, version: &str) -> PackyardResult<()> {
        validate_segment("package", package)?;
        validate_segment("version", version)?;

        let check_tag = match self.versions.policy() {
            LatestPolicy::NewestSemverTag => true,
            LatestPolicy::HeadRevision => !is_commit_hash(version),
        };
        if check_tag && !self.versions.list_tags().await?.iter().any(|t| t == version) {
            debug!("{} is not a tag", version);
            return Err(PackyardError::VersionNotFound(version.to_string()));
        }

        if !self
            .versions
            .list_packages(version)
            .await?
            .iter()
            .any(|p| p == package)
        {
            return Err(PackyardError::PackageNotFound {
                package: package.to_string(),
                version: version.to_string(),
            });
        }

        Ok(())
    }

    /// Resolved version and build manifest, building on a store miss
    pub async fn manifest(
        &self,
        package: &str,
        requested: &RequestedVersion,
    ) -> PackyardResult<(String, BuildManifest)> {
        let version = self.concrete_version(requested).await?;
        self.check_exists(package, &version).await?;

        if let Some(text) = self.store.get_manifest(package, &version).await? {
            debug!("Manifest hit for {}@{}", package, version);
            return Ok((version, BuildManifest::from_stored(text)));
        }

        let key = format!("{}@{}", package, version);
        let _guard = self.coalescer.acquire(&key).await;

        // Another request may have built it while we waited
        if let Some(text) = self.store.get_manifest(package, &version).await? {
            debug!("Manifest for {} built by a concurrent request", key);
            return Ok((version, BuildManifest::from_stored(text)));
        }

        info!("No build of {} stored, building", key);
        let manifest = self.builder.build(package, &version).await?;
        Ok((version, manifest))
    }

    /// Resolve a request to artifact bytes.
    ///
    /// With no (or an empty) `path` the primary artifact is served.
    pub async fn resolve(
        &self,
        package: &str,
        requested: &RequestedVersion,
        path: Option<&str>,
    ) -> PackyardResult<ResolvedArtifact> {
        let (version, manifest) = self.manifest(package, requested).await?;

        let file_name = match path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(path) => requested_file_name(path).to_string(),
            None => manifest
                .primary_file_name()
                .ok_or_else(|| PackyardError::NoPrimaryArtifact {
                    package: package.to_string(),
                    version: version.clone(),
                })?
                .to_string(),
        };

        if validate_segment("file", &file_name).is_err() {
            return Err(PackyardError::FileNotFound {
                package: package.to_string(),
                version,
                path: file_name,
            });
        }

        match self.store.get_artifact(package, &version, &file_name).await? {
            Some(content) => Ok(ResolvedArtifact {
                package: package.to_string(),
                version,
                file_name,
                content,
            }),
            None if manifest.lists(&file_name) => {
                error!(
                    "Store integrity fault: {} listed in manifest of {}@{} but missing",
                    file_name, package, version
                );
                Err(PackyardError::ArtifactMissing {
                    package: package.to_string(),
                    version,
                    file_name,
                })
            }
            None => Err(PackyardError::FileNotFound {
                package: package.to_string(),
                version,
                path: file_name,
            }),
        }
    }

    /// Packages of the latest version, empty when upstream is unavailable
    pub async fn list_latest_packages(&self) -> Vec<String> {
        let listing = async {
            let version = self.versions.resolve_latest().await?;
            self.versions.list_packages(&version).await
        };

        match listing.await {
            Ok(packages) => packages,
            Err(e) => {
                warn!("Package listing unavailable: {}", e);
                Vec::new()
            }
        }
    }
}

/// File name a request path refers to: the manifest pattern if it matches,
/// the last path segment otherwise
fn requested_file_name(path: &str) -> &str {
    extract_file_name(path).unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path))
}

fn is_commit_hash(version: &str) -> bool {
    version.len() == 40 && version.bytes().all(|b| b.is_ascii_hexdigit())
}
