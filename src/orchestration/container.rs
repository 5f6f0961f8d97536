//! Container-backed build sandbox
//!
//! Drives the `podman` (or `docker`) CLI directly. Each workspace is a
//! detached container kept alive by `sleep infinity`; commands run through
//! `exec`, and teardown is `rm -f`.

use crate::config::schema::SandboxConfig;
use crate::config::RuntimeKind;
use crate::error::{PackyardError, PackyardResult};
use crate::orchestration::sandbox::{CommandOutput, SandboxProvider, Workspace};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Workspace name prefix, used to find leftovers with `ps --filter`
pub const WORKSPACE_PREFIX: &str = "packyard-build-";

/// Execute a container CLI command and return the output
async fn exec(binary: &str, args: &[&str]) -> PackyardResult<std::process::Output> {
    debug!("Executing: {} {:?}", binary, args);

    Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| PackyardError::command_failed(format!("{} {:?}", binary, args), e))
}

/// Sandbox provider using a rootless container runtime
pub struct ContainerSandbox {
    config: SandboxConfig,
}

impl ContainerSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    fn binary(&self) -> &'static str {
        self.config.runtime.binary()
    }

    /// Check if the runtime CLI is installed
    async fn runtime_installed(&self) -> bool {
        Command::new(self.binary())
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Check if image exists locally
    async fn image_exists(&self, image: &str) -> PackyardResult<bool> {
        let output = exec(self.binary(), &["image", "inspect", image]).await?;
        Ok(output.status.success())
    }

    /// Pull an image
    async fn pull(&self, image: &str) -> PackyardResult<()> {
        info!("Pulling image: {}", image);

        let output = exec(self.binary(), &["pull", image]).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(PackyardError::WorkspaceCreate(format!(
                "pulling {}: {}",
                image,
                stderr.trim()
            )))
        }
    }

    /// Arguments for `run` that start one idle workspace container
    fn run_args(&self, name: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            name.to_string(),
            "-w".to_string(),
            self.config.workdir.clone(),
            "--network".to_string(),
            self.config.network.clone(),
            "--security-opt".to_string(),
            "no-new-privileges".to_string(),
        ];

        if self.config.pids_limit > 0 {
            args.push("--pids-limit".to_string());
            args.push(self.config.pids_limit.to_string());
        }

        args.push(self.config.image.clone());
        args.push("sleep".to_string());
        args.push("infinity".to_string());
        args
    }
}

#[async_trait]
impl SandboxProvider for ContainerSandbox {
    async fn ensure_ready(&self) -> PackyardResult<()> {
        if !self.runtime_installed().await {
            return Err(PackyardError::RuntimeNotFound(self.binary().to_string()));
        }
        Ok(())
    }

    async fn create(&self) -> PackyardResult<Arc<dyn Workspace>> {
        if !self.image_exists(&self.config.image).await? {
            self.pull(&self.config.image).await?;
        }

        let name = format!("{}{}", WORKSPACE_PREFIX, uuid::Uuid::new_v4().simple());
        // `run` may leave a container behind even when it fails or is cancelled
        let mut pending = PendingWorkspace::new(ContainerWorkspace {
            binary: self.binary(),
            name: name.clone(),
        });

        let args = self.run_args(&name);
        let args_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = exec(self.binary(), &args_refs).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(workspace) = pending.disarm() {
                let _ = workspace.destroy().await;
            }
            return Err(PackyardError::WorkspaceCreate(stderr.trim().to_string()));
        }

        info!("Workspace started: {}", name);
        match pending.disarm() {
            Some(workspace) => Ok(Arc::new(workspace)),
            None => Err(PackyardError::Internal(format!("workspace {} lost", name))),
        }
    }

    fn runtime_name(&self) -> &'static str {
        match self.config.runtime {
            RuntimeKind::Podman => "Podman",
            RuntimeKind::Docker => "Docker",
        }
    }
}

/// Removes a workspace container that is still being started unless disarmed
struct PendingWorkspace {
    workspace: Option<ContainerWorkspace>,
}

impl PendingWorkspace {
    fn new(workspace: ContainerWorkspace) -> Self {
        Self {
            workspace: Some(workspace),
        }
    }

    fn disarm(&mut self) -> Option<ContainerWorkspace> {
        self.workspace.take()
    }
}

impl Drop for PendingWorkspace {
    fn drop(&mut self) {
        let Some(workspace) = self.workspace.take() else {
            return;
        };

        warn!("Start of workspace {} interrupted, removing it", workspace.name);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = workspace.destroy().await {
                        warn!("Failed to remove workspace {}: {}", workspace.name, e);
                    }
                });
            }
            Err(_) => warn!("No runtime available to remove workspace {}", workspace.name),
        }
    }
}

/// A running workspace container
pub struct ContainerWorkspace {
    binary: &'static str,
    name: String,
}

#[async_trait]
impl Workspace for ContainerWorkspace {
    fn id(&self) -> &str {
        &self.name
    }

    async fn run(&self, script: &str, cwd: &str) -> PackyardResult<CommandOutput> {
        let output = exec(
            self.binary,
            &["exec", "-w", cwd, self.name.as_str(), "sh", "-c", script],
        )
        .await?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn read_file(&self, path: &str) -> PackyardResult<Vec<u8>> {
        let output = exec(self.binary, &["exec", self.name.as_str(), "cat", "--", path]).await?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(PackyardError::WorkspaceRead {
                path: path.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    async fn destroy(&self) -> PackyardResult<()> {
        debug!("Removing workspace: {}", self.name);

        let output = exec(self.binary, &["rm", "-f", self.name.as_str()]).await?;

        if output.status.success() {
            Ok(())
        } else {
            // Ignore error if container doesn't exist
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_lowercase().contains("no such container") {
                Ok(())
            } else {
                Err(PackyardError::command_exec(
                    format!("{} rm", self.binary),
                    stderr,
                ))
            }
        }
    }
}
