//! Build sandbox abstraction
//!
//! A [`SandboxProvider`] hands out disposable [`Workspace`]s. Builds hold a
//! workspace through a [`WorkspaceLease`], which destroys it when released
//! and, if the owning future is dropped first, from its `Drop` impl.

use crate::error::PackyardResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Captured result of one workspace command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (-1 when killed by a signal)
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// One isolated, disposable build environment
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Identifier for logs
    fn id(&self) -> &str;

    /// Run a POSIX shell script with `cwd` as working directory
    async fn run(&self, script: &str, cwd: &str) -> PackyardResult<CommandOutput>;

    /// Read a file by absolute path
    async fn read_file(&self, path: &str) -> PackyardResult<Vec<u8>>;

    /// Tear the workspace down. Safe to call on an already destroyed workspace.
    async fn destroy(&self) -> PackyardResult<()>;
}

/// Source of workspaces
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Check that the backing runtime can create workspaces
    async fn ensure_ready(&self) -> PackyardResult<()>;

    /// Create a fresh workspace
    async fn create(&self) -> PackyardResult<Arc<dyn Workspace>>;

    /// Get the human-readable runtime name for display
    fn runtime_name(&self) -> &'static str;
}

/// Owns a workspace until it is released or dropped
pub struct WorkspaceLease {
    workspace: Option<Arc<dyn Workspace>>,
}

impl WorkspaceLease {
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self {
            workspace: Some(workspace),
        }
    }

    /// The leased workspace
    pub fn workspace(&self) -> Arc<dyn Workspace> {
        match self.workspace {
            Some(ref ws) => Arc::clone(ws),
            None => unreachable!("workspace is only taken by release or drop"),
        }
    }

    /// Destroy the workspace now. Teardown errors are logged, not returned.
    ///
    /// The lease keeps the workspace until `destroy` succeeds, so a failed or
    /// cancelled release still leaves the teardown to `Drop`.
    pub async fn release(mut self) {
        let Some(ws) = self.workspace.clone() else {
            return;
        };

        match ws.destroy().await {
            Ok(()) => {
                debug!("Destroyed workspace {}", ws.id());
                self.workspace = None;
            }
            Err(e) => warn!("Failed to destroy workspace {}: {}", ws.id(), e),
        }
    }
}

impl Drop for WorkspaceLease {
    fn drop(&mut self) {
        let Some(ws) = self.workspace.take() else {
            return;
        };

        warn!("Workspace {} abandoned, scheduling teardown", ws.id());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = ws.destroy().await {
                        warn!("Failed to destroy workspace {}: {}", ws.id(), e);
                    }
                });
            }
            Err(_) => warn!("No runtime available to destroy workspace {}", ws.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSandbox;
    use std::time::Duration;

    #[tokio::test]
    async fn release_destroys_workspace() {
        let sandbox = FakeSandbox::new();
        let lease = WorkspaceLease::new(sandbox.create().await.unwrap());

        lease.release().await;
        assert_eq!(sandbox.live_workspaces(), 0);
    }

    #[tokio::test]
    async fn dropped_lease_destroys_workspace() {
        let sandbox = FakeSandbox::new();
        {
            let _lease = WorkspaceLease::new(sandbox.create().await.unwrap());
            assert_eq!(sandbox.live_workspaces(), 1);
        }

        // Teardown runs on a spawned task
        for _ in 0..50 {
            if sandbox.live_workspaces() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(sandbox.live_workspaces(), 0);
    }

    #[tokio::test]
    async fn cancelled_release_still_destroys_workspace() {
        let sandbox = FakeSandbox::new().with_destroy_delay(Duration::from_millis(50));
        let lease = WorkspaceLease::new(sandbox.create().await.unwrap());

        let cancelled = tokio::time::timeout(Duration::from_millis(5), lease.release()).await;
        assert!(cancelled.is_err());

        for _ in 0..100 {
            if sandbox.live_workspaces() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(sandbox.live_workspaces(), 0);
    }

    #[tokio::test]
    async fn failed_release_retries_from_drop() {
        let sandbox = FakeSandbox::new().failing_destroys(1);
        let lease = WorkspaceLease::new(sandbox.create().await.unwrap());

        lease.release().await;

        for _ in 0..50 {
            if sandbox.live_workspaces() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(sandbox.live_workspaces(), 0);
    }

    #[test]
    fn command_output_success() {
        let ok = CommandOutput {
            code: 0,
            ..Default::default()
        };
        let failed = CommandOutput {
            code: 2,
            ..Default::default()
        };
        assert!(ok.success());
        assert!(!failed.success());
    }
}
