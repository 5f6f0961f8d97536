//! Build command - build a package version into the store

use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::PackyardResult;
use crate::resolve::PackageRef;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> PackyardResult<()> {
    let ctx = UiContext::detect();
    let package = PackageRef::parse(&args.package)?;
    let resolver = super::resolver(config, false).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Building {}...", package));

    let (version, manifest) = match resolver.manifest(&package.name, &package.version).await {
        Ok(built) => built,
        Err(e) => {
            spinner.stop_error(&format!("Build of {} failed", package));
            return Err(e);
        }
    };
    spinner.stop(&format!("{}@{} ready", package.name, version));

    for (_, file_name) in manifest.entries() {
        ui::key_value(&ctx, "Artifact", file_name);
    }
    if let Some(primary) = manifest.primary_file_name() {
        ui::key_value(&ctx, "Primary", primary);
    }

    Ok(())
}
