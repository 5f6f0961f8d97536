//! Upstream repository host
//!
//! The package collection lives in one repository: every directory under
//! `packages_dir` at a given revision is a package, and every tag is a
//! version. [`UpstreamHost`] abstracts the host API; [`VersionResolver`]
//! puts a TTL cache in front of it and translates `latest`.

mod github;
mod resolver;

pub use github::GithubClient;
pub use resolver::{newest_semver_tag, VersionResolver};

use crate::error::{PackyardError, PackyardResult};
use async_trait::async_trait;

/// Read-only view of the repository host
#[async_trait]
pub trait UpstreamHost: Send + Sync {
    /// All tag names of the repository
    async fn list_tags(&self) -> PackyardResult<Vec<String>>;

    /// Names of the directories under the package collection at `revision`
    async fn list_package_dirs(&self, revision: &str) -> PackyardResult<Vec<String>>;

    /// Revision hash of the most recent commit on the default branch
    async fn head_revision(&self) -> PackyardResult<String>;
}

/// Owner and name of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse `https://github.com/<owner>/<repo>` (trailing `.git` or `/` allowed)
    pub fn parse(url: &str) -> PackyardResult<Self> {
        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("http://github.com/"))
            .ok_or_else(|| PackyardError::RepositoryUrl(url.to_string()))?;

        let rest = rest.trim_end_matches('/');
        let rest = rest.strip_suffix(".git").unwrap_or(rest);

        let mut parts = rest.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(PackyardError::RepositoryUrl(url.to_string())),
        }
    }

    /// URL that `git fetch` accepts
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.repo)
    }
}
