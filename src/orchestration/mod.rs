//! Orchestration of isolated build workspaces
//!
//! Provides platform-agnostic sandbox management:
//! - [`SandboxProvider`] / [`Workspace`]: the execution provider interface
//! - [`ContainerSandbox`]: rootless Podman (or Docker) implementation

mod container;
mod factory;
mod sandbox;

pub use container::{ContainerSandbox, ContainerWorkspace, WORKSPACE_PREFIX};
pub use factory::create_sandbox;
pub use sandbox::{CommandOutput, SandboxProvider, Workspace, WorkspaceLease};

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of build output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `BUILD_ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub(crate) fn build_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > BUILD_ERROR_TAIL_LINES {
        lines[total - BUILD_ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// Quote a string for a POSIX shell
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
