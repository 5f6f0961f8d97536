//! Error types for Packyard
//!
//! All modules use `PackyardResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Packyard operations
pub type PackyardResult<T> = Result<T, PackyardError>;

/// All errors that can occur in Packyard
#[derive(Error, Debug)]
pub enum PackyardError {
    // Lookup errors
    #[error("Package not found: {package}@{version}")]
    PackageNotFound { package: String, version: String },

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("File not found: {package}@{version}/{path}")]
    FileNotFound {
        package: String,
        version: String,
        path: String,
    },

    #[error("No manifest line of {package}@{version} names an artifact")]
    NoPrimaryArtifact { package: String, version: String },

    #[error("Artifact {file_name} listed in manifest of {package}@{version} is missing from the store")]
    ArtifactMissing {
        package: String,
        version: String,
        file_name: String,
    },

    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidName {
        kind: &'static str,
        value: String,
        reason: String,
    },

    // Upstream errors
    #[error("Upstream request failed: {url}: {reason}")]
    UpstreamRequest { url: String, reason: String },

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Unexpected upstream response from {url}: {reason}")]
    UpstreamDecode { url: String, reason: String },

    #[error("Unsupported repository URL: {0}. Expected https://github.com/<owner>/<repo>")]
    RepositoryUrl(String),

    #[error("No version of the repository could be resolved as latest")]
    NoLatestVersion,

    // Build errors
    #[error("Build of {package}@{version} failed: {reason}")]
    BuildFailed {
        package: String,
        version: String,
        reason: String,
    },

    #[error("Cannot extract a file name from manifest line: {0}")]
    ManifestLine(String),

    #[error("Build of {package}@{version} produced no artifacts")]
    EmptyManifest { package: String, version: String },

    #[error("Build of {package}@{version} timed out after {secs}s")]
    BuildTimeout {
        package: String,
        version: String,
        secs: u64,
    },

    // Sandbox errors
    #[error("Container runtime not found: {0}")]
    RuntimeNotFound(String),

    #[error("Failed to create build workspace: {0}")]
    WorkspaceCreate(String),

    #[error("Failed to read {path} from workspace: {reason}")]
    WorkspaceRead { path: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Store errors
    #[error("Corrupt store entry {path}: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PackyardError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the error means "nothing to serve" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PackageNotFound { .. }
                | Self::VersionNotFound(_)
                | Self::FileNotFound { .. }
                | Self::NoPrimaryArtifact { .. }
                | Self::ArtifactMissing { .. }
                | Self::InvalidName { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RuntimeNotFound(_) => Some("Install podman, or set sandbox.runtime = \"docker\""),
            Self::UpstreamStatus { status: 403, .. } | Self::UpstreamStatus { status: 429, .. } => {
                Some("GitHub rate limit reached. Export a token and set upstream.token_env")
            }
            Self::RepositoryUrl(_) => Some("Set upstream.repository in the config file"),
            Self::BuildTimeout { .. } => Some("Raise sandbox.build_timeout_secs"),
            _ => None,
        }
    }
}
