//! Configuration management for Packyard

pub mod schema;

pub use schema::{Config, LatestPolicy, RuntimeKind};

use crate::error::{PackyardError, PackyardResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("packyard")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("packyard")
    }

    /// Get the store directory, honoring `cache.store_dir`
    pub fn store_dir(config: &Config) -> PathBuf {
        config
            .cache
            .store_dir
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("store"))
    }

    /// Get the audit log path
    pub fn audit_log_path() -> PathBuf {
        Self::state_dir().join("audit.log")
    }

    /// Load configuration, falling back to defaults if the file is absent
    pub async fn load(&self) -> PackyardResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PackyardResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PackyardError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| PackyardError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.upstream.packages_dir, "packages");
    }

    #[tokio::test]
    async fn shown_config_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path.clone());

        let mut config = Config::default();
        config.upstream.repository = "https://github.com/acme/pkl-things".to_string();
        config.resolve.latest = LatestPolicy::HeadRevision;

        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.upstream.repository, "https://github.com/acme/pkl-things");
        assert_eq!(loaded.resolve.latest, LatestPolicy::HeadRevision);
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\ntags_ttl_secs = \"soon\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        match err {
            PackyardError::ConfigInvalid { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn store_dir_override() {
        let mut config = Config::default();
        config.cache.store_dir = Some(PathBuf::from("/srv/packyard"));
        assert_eq!(ConfigManager::store_dir(&config), PathBuf::from("/srv/packyard"));
    }
}
