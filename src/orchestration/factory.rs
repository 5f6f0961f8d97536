//! Sandbox factory
//!
//! Selects the sandbox provider for the current platform and config.

use crate::config::schema::SandboxConfig;
use crate::error::{PackyardError, PackyardResult};
use crate::orchestration::container::ContainerSandbox;
use crate::orchestration::sandbox::SandboxProvider;
use std::sync::Arc;

/// Platforms where the runtime CLI can start rootless containers
const SUPPORTED_PLATFORMS: &[&str] = &["linux", "macos"];

/// Create the build sandbox provider for this platform
///
/// On macOS the runtime CLI talks to the runtime's VM transparently.
pub fn create_sandbox(config: &SandboxConfig) -> PackyardResult<Arc<dyn SandboxProvider>> {
    sandbox_for(std::env::consts::OS, config)
}

fn sandbox_for(os: &str, config: &SandboxConfig) -> PackyardResult<Arc<dyn SandboxProvider>> {
    if !SUPPORTED_PLATFORMS.contains(&os) {
        return Err(PackyardError::RuntimeNotFound(format!(
            "no container sandbox on {}",
            os
        )));
    }
    Ok(Arc::new(ContainerSandbox::new(config.clone())))
}
