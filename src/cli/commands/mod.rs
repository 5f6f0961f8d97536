//! CLI command implementations

pub mod build;
pub mod config;
pub mod fetch;
pub mod serve;
pub mod tags;

pub use build::execute as build;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use serve::execute as serve;
pub use tags::{packages, tags};

use crate::audit::AuditLog;
use crate::build::BuildExecutor;
use crate::cache::TtlCache;
use crate::config::{Config, ConfigManager};
use crate::error::PackyardResult;
use crate::orchestration::create_sandbox;
use crate::resolve::Resolver;
use crate::store::{ArtifactStore, FsStore, MemoryStore};
use crate::upstream::{GithubClient, VersionResolver};
use std::sync::Arc;
use tracing::debug;

/// Open the configured store, or an in-memory one
async fn open_store(config: &Config, ephemeral: bool) -> PackyardResult<Arc<dyn ArtifactStore>> {
    if ephemeral {
        debug!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let root = ConfigManager::store_dir(config);
    debug!("Using store at {}", root.display());
    Ok(Arc::new(FsStore::open(root).await?))
}

/// Cached view of the upstream repository
fn version_resolver(config: &Config, store: Arc<dyn ArtifactStore>) -> PackyardResult<VersionResolver> {
    let host = GithubClient::from_config(&config.upstream)?;
    Ok(VersionResolver::from_config(
        Arc::new(host),
        TtlCache::new(store),
        config,
    ))
}

/// Wire store, upstream, sandbox and builder into a resolver
async fn resolver(config: &Config, ephemeral: bool) -> PackyardResult<Resolver> {
    let store = open_store(config, ephemeral).await?;
    let versions = version_resolver(config, Arc::clone(&store))?;
    let sandbox = create_sandbox(&config.sandbox)?;
    let builder = BuildExecutor::new(
        config,
        sandbox,
        Arc::clone(&store),
        Arc::new(AuditLog::new(config)),
    )?;

    Ok(Resolver::new(versions, store, Arc::new(builder)))
}
