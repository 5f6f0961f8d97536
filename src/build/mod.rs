//! On-demand package builds
//!
//! [`BuildExecutor`] runs the packaging tool for one (package, version) in a
//! disposable workspace and persists the resulting artifacts and manifest.

mod executor;
pub mod manifest;

pub use executor::BuildExecutor;
pub use manifest::{extract_file_name, BuildManifest};

use crate::error::PackyardResult;
use async_trait::async_trait;

/// Something that can produce and persist the build of a package version
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    /// Build `package` at the concrete `version`, persist every artifact and
    /// then the manifest, and return the manifest.
    async fn build(&self, package: &str, version: &str) -> PackyardResult<BuildManifest>;
}
