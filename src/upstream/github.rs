//! GitHub REST API client
//!
//! Uses a blocking `ureq` agent; every call is moved to the blocking pool so
//! request handlers stay responsive while GitHub is slow.

use crate::config::schema::UpstreamConfig;
use crate::error::{PackyardError, PackyardResult};
use crate::upstream::{RepoRef, UpstreamHost};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("packyard/", env!("CARGO_PKG_VERSION"));

/// Page size for paginated listings (GitHub maximum)
const PER_PAGE: usize = 100;

/// Stop following pagination after this many pages
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Commit {
    sha: String,
}

/// Client for one GitHub repository
#[derive(Clone)]
pub struct GithubClient {
    agent: ureq::Agent,
    api_base: String,
    repo: RepoRef,
    packages_dir: String,
    token: Option<String>,
}

impl GithubClient {
    /// Create a client from config, reading the token from the configured env var
    pub fn from_config(config: &UpstreamConfig) -> PackyardResult<Self> {
        let repo = RepoRef::parse(&config.repository)?;
        let token = config
            .token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|t| !t.trim().is_empty());

        if token.is_some() {
            debug!("Using API token for {}", config.api_base);
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            agent,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            repo,
            packages_dir: config.packages_dir.trim_matches('/').to_string(),
            token,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.repo.owner, self.repo.repo, path
        )
    }

    /// GET a URL with query parameters and decode its JSON body. Any non-2xx
    /// status is an error.
    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> PackyardResult<T> {
        debug!("GET {} {:?}", url, query);

        let mut request = self
            .agent
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let mut response = request.call().map_err(|e| PackyardError::UpstreamRequest {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PackyardError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| PackyardError::UpstreamRequest {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        serde_json::from_str(&body).map_err(|e| PackyardError::UpstreamDecode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn fetch_tags(&self) -> PackyardResult<Vec<String>> {
        let mut tags = Vec::new();
        let url = self.repo_url("tags");
        let per_page = PER_PAGE.to_string();
        for page in 1..=MAX_PAGES {
            let page = page.to_string();
            let batch: Vec<Tag> =
                self.get_json(&url, &[("per_page", per_page.as_str()), ("page", page.as_str())])?;
            let done = batch.len() < PER_PAGE;
            tags.extend(batch.into_iter().map(|t| t.name));
            if done {
                break;
            }
        }
        debug!("Fetched {} tags", tags.len());
        Ok(tags)
    }

    fn fetch_package_dirs(&self, revision: &str) -> PackyardResult<Vec<String>> {
        let url = self.repo_url(&format!("contents/{}", self.packages_dir));

        let entries: Vec<ContentEntry> = match self.get_json(&url, &[("ref", revision)]) {
            Ok(entries) => entries,
            // The ref (or the collection at that ref) does not exist
            Err(PackyardError::UpstreamStatus { status: 404, .. }) => {
                return Err(PackyardError::VersionNotFound(revision.to_string()))
            }
            Err(e) => return Err(e),
        };

        Ok(entries
            .into_iter()
            .filter(|entry| entry.kind == "dir")
            .map(|entry| entry.name)
            .collect())
    }

    fn fetch_head_revision(&self) -> PackyardResult<String> {
        let url = self.repo_url("commits");
        let commits: Vec<Commit> = self.get_json(&url, &[("per_page", "1")])?;
        commits
            .into_iter()
            .next()
            .map(|c| c.sha)
            .filter(|sha| !sha.is_empty())
            .ok_or(PackyardError::NoLatestVersion)
    }

    async fn blocking<T, F>(&self, f: F) -> PackyardResult<T>
    where
        T: Send + 'static,
        F: FnOnce(GithubClient) -> PackyardResult<T> + Send + 'static,
    {
        let client = self.clone();
        tokio::task::spawn_blocking(move || f(client))
            .await
            .map_err(|e| PackyardError::Internal(format!("upstream task failed: {}", e)))?
    }
}

#[async_trait]
impl UpstreamHost for GithubClient {
    async fn list_tags(&self) -> PackyardResult<Vec<String>> {
        self.blocking(|client| client.fetch_tags()).await
    }

    async fn list_package_dirs(&self, revision: &str) -> PackyardResult<Vec<String>> {
        let revision = revision.to_string();
        self.blocking(move |client| client.fetch_package_dirs(&revision))
            .await
    }

    async fn head_revision(&self) -> PackyardResult<String> {
        self.blocking(|client| client.fetch_head_revision()).await
    }
}
