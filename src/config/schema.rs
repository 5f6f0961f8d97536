//! Configuration schema for Packyard
//!
//! Configuration is stored at `~/.config/packyard/config.toml`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Upstream repository settings
    pub upstream: UpstreamConfig,

    /// Version resolution settings
    pub resolve: ResolveConfig,

    /// Cache and store settings
    pub cache: CacheConfig,

    /// Build sandbox settings
    pub sandbox: SandboxConfig,

    /// Packaging tool settings
    pub tool: ToolConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record build events to the audit log
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Upstream repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Repository holding the package collection
    pub repository: String,

    /// REST API base URL
    pub api_base: String,

    /// Directory inside the repository that holds one subdirectory per package
    pub packages_dir: String,

    /// Environment variable holding an API token (optional)
    pub token_env: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            repository: "https://github.com/lucsoft/cluster".to_string(),
            api_base: "https://api.github.com".to_string(),
            packages_dir: "packages".to_string(),
            token_env: Some("GITHUB_TOKEN".to_string()),
            timeout_secs: 30,
        }
    }
}

/// How the symbolic `latest` version is translated to a concrete one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LatestPolicy {
    /// Highest tag by semantic version ordering
    #[default]
    NewestSemverTag,
    /// Revision hash of the most recent commit
    HeadRevision,
}

impl fmt::Display for LatestPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewestSemverTag => write!(f, "newest-semver-tag"),
            Self::HeadRevision => write!(f, "head-revision"),
        }
    }
}

/// Version resolution settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Policy for `latest`
    pub latest: LatestPolicy,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Max age of the cached tag list
    pub tags_ttl_secs: u64,

    /// Max age of a cached per-version package list
    pub packages_ttl_secs: u64,

    /// Store directory (defaults to the state directory)
    pub store_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tags_ttl_secs: 2 * 60,
            packages_ttl_secs: 60 * 60,
            store_dir: None,
        }
    }
}

/// Container runtime used for build sandboxes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Podman,
    Docker,
}

impl RuntimeKind {
    /// CLI binary name
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Podman => "podman",
            Self::Docker => "docker",
        }
    }
}

/// Build sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Container runtime
    pub runtime: RuntimeKind,

    /// Image providing git, curl and a POSIX shell
    pub image: String,

    /// Home directory of the build inside the container
    pub workdir: String,

    /// Network mode
    pub network: String,

    /// PID limit (0 = no limit)
    pub pids_limit: u32,

    /// Upper bound for one complete build
    pub build_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeKind::Podman,
            image: "docker.io/library/buildpack-deps:bookworm-scm".to_string(),
            workdir: "/home/app".to_string(),
            network: "bridge".to_string(),
            pids_limit: 4096,
            build_timeout_secs: 15 * 60,
        }
    }
}

/// Packaging tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Binary name inside the workspace
    pub name: String,

    /// Where to download the binary from
    pub download_url: String,

    /// Arguments that package a project without publish checks
    pub package_args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            name: "pkl".to_string(),
            download_url: "https://github.com/apple/pkl/releases/download/0.30.2/pkl-linux-amd64"
                .to_string(),
            package_args: vec![
                "project".to_string(),
                "package".to_string(),
                "--skip-publish-check".to_string(),
            ],
        }
    }
}
