//! Build executor
//!
//! One build, start to finish:
//!
//! 1. Lease a fresh workspace from the sandbox provider
//! 2. Fetch exactly the requested revision (shallow)
//! 3. Download the packaging tool
//! 4. Run the tool in the package directory and parse its stdout
//! 5. Read every listed artifact out of the workspace
//! 6. Release the workspace, persist the artifacts, persist the manifest
//!
//! The manifest is written last: a reader that finds a manifest always finds
//! its artifacts. Nothing is written when any step fails.

use crate::audit::AuditLog;
use crate::build::manifest::BuildManifest;
use crate::build::PackageBuilder;
use crate::config::schema::ToolConfig;
use crate::config::Config;
use crate::error::{PackyardError, PackyardResult};
use crate::orchestration::{
    build_error_output, shell_quote, CommandOutput, SandboxProvider, Workspace, WorkspaceLease,
};
use crate::store::{validate_segment, ArtifactStore};
use crate::upstream::RepoRef;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Artifacts read out of a workspace, not yet persisted
type Staged = (BuildManifest, Vec<(String, Vec<u8>)>);

/// Builds packages in sandboxes and persists the results
pub struct BuildExecutor {
    sandbox: Arc<dyn SandboxProvider>,
    store: Arc<dyn ArtifactStore>,
    audit: Arc<AuditLog>,
    clone_url: String,
    packages_dir: String,
    workdir: String,
    tool: ToolConfig,
    timeout: Duration,
}

impl BuildExecutor {
    pub fn new(
        config: &Config,
        sandbox: Arc<dyn SandboxProvider>,
        store: Arc<dyn ArtifactStore>,
        audit: Arc<AuditLog>,
    ) -> PackyardResult<Self> {
        let repo = RepoRef::parse(&config.upstream.repository)?;
        Ok(Self {
            sandbox,
            store,
            audit,
            clone_url: repo.clone_url(),
            packages_dir: config.upstream.packages_dir.trim_matches('/').to_string(),
            workdir: config.sandbox.workdir.trim_end_matches('/').to_string(),
            tool: config.tool.clone(),
            timeout: Duration::from_secs(config.sandbox.build_timeout_secs),
        })
    }

    fn package_dir(&self, package: &str) -> String {
        format!("{}/repo/{}/{}", self.workdir, self.packages_dir, package)
    }

    /// Run one script, turning a non-zero exit into a build failure
    async fn step(
        &self,
        ws: &dyn Workspace,
        name: &str,
        cwd: &str,
        script: &str,
        package: &str,
        version: &str,
    ) -> PackyardResult<CommandOutput> {
        debug!("[{}] {}: {}", ws.id(), name, script);
        let output = ws.run(script, cwd).await?;

        if output.success() {
            Ok(output)
        } else {
            Err(PackyardError::BuildFailed {
                package: package.to_string(),
                version: version.to_string(),
                reason: format!(
                    "{} exited with code {}\n{}",
                    name,
                    output.code,
                    build_error_output(&output.stdout, &output.stderr)
                ),
            })
        }
    }

    /// Everything that happens inside the workspace
    async fn build_in(
        &self,
        ws: &dyn Workspace,
        package: &str,
        version: &str,
    ) -> PackyardResult<Staged> {
        let repo_dir = format!("{}/repo", self.workdir);
        let bin_dir = format!("{}/bin", self.workdir);
        let package_dir = self.package_dir(package);
        let tool_path = format!("{}/{}", bin_dir, self.tool.name);

        let fetch = format!(
            "mkdir -p repo bin && cd repo && git init -q && \
             git fetch -q --depth 1 {} {} && git checkout -q --detach FETCH_HEAD",
            shell_quote(&self.clone_url),
            shell_quote(version)
        );
        self.step(ws, "fetch revision", &self.workdir, &fetch, package, version)
            .await?;

        let install = format!(
            "curl -fsSL -o {name} {url} && chmod +x {name} && ./{name} --version",
            name = shell_quote(&self.tool.name),
            url = shell_quote(&self.tool.download_url)
        );
        let tool_version = self
            .step(ws, "install tool", &bin_dir, &install, package, version)
            .await?;
        debug!("Packaging tool: {}", tool_version.stdout.trim());

        let exists = ws
            .run(&format!("test -d {}", shell_quote(&package_dir)), &repo_dir)
            .await?;
        if !exists.success() {
            return Err(PackyardError::PackageNotFound {
                package: package.to_string(),
                version: version.to_string(),
            });
        }

        let mut command = vec![shell_quote(&tool_path)];
        command.extend(self.tool.package_args.iter().map(|a| shell_quote(a)));
        let output = self
            .step(ws, "package", &package_dir, &command.join(" "), package, version)
            .await?;

        let manifest = BuildManifest::parse(&output.stdout)?;
        if manifest.is_empty() {
            return Err(PackyardError::EmptyManifest {
                package: package.to_string(),
                version: version.to_string(),
            });
        }

        let mut artifacts = Vec::new();
        for (line, file_name) in manifest.entries() {
            let path = if line.starts_with('/') {
                line.to_string()
            } else {
                format!("{}/{}", package_dir, line)
            };
            let data = ws.read_file(&path).await?;
            debug!("Staged {} ({} bytes)", file_name, data.len());
            artifacts.push((file_name.to_string(), data));
        }

        Ok((manifest, artifacts))
    }

    /// Lease, build, release, then persist
    async fn build_and_store(&self, package: &str, version: &str) -> PackyardResult<BuildManifest> {
        let lease = WorkspaceLease::new(self.sandbox.create().await?);
        let staged = self
            .build_in(lease.workspace().as_ref(), package, version)
            .await;
        lease.release().await;

        let (manifest, artifacts) = staged?;
        for (file_name, data) in &artifacts {
            self.store
                .put_artifact(package, version, file_name, data)
                .await?;
        }
        self.store
            .put_manifest(package, version, manifest.as_str())
            .await?;

        Ok(manifest)
    }
}

#[async_trait]
impl PackageBuilder for BuildExecutor {
    async fn build(&self, package: &str, version: &str) -> PackyardResult<BuildManifest> {
        validate_segment("package", package)?;
        validate_segment("version", version)?;

        info!("Building {}@{}", package, version);
        let started = Instant::now();
        self.audit
            .log(
                "build.started",
                &serde_json::json!({ "package": package, "version": version }),
            )
            .await;

        let result = match tokio::time::timeout(self.timeout, self.build_and_store(package, version))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(PackyardError::BuildTimeout {
                package: package.to_string(),
                version: version.to_string(),
                secs: self.timeout.as_secs(),
            }),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(manifest) => {
                let files: Vec<&str> = manifest.entries().map(|(_, name)| name).collect();
                info!(
                    "Built {}@{} in {}ms: {}",
                    package,
                    version,
                    elapsed_ms,
                    files.join(", ")
                );
                self.audit
                    .log(
                        "build.completed",
                        &serde_json::json!({
                            "package": package,
                            "version": version,
                            "files": files,
                            "duration_ms": elapsed_ms,
                        }),
                    )
                    .await;
            }
            Err(e) => {
                warn!("Build of {}@{} failed: {}", package, version, e);
                self.audit
                    .log(
                        "build.failed",
                        &serde_json::json!({
                            "package": package,
                            "version": version,
                            "error": e.to_string(),
                            "duration_ms": elapsed_ms,
                        }),
                    )
                    .await;
            }
        }

        result
    }
}
