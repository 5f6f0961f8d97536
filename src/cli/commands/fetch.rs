//! Fetch command - write an artifact to a file or stdout

use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{PackyardError, PackyardResult};
use crate::resolve::PackageRef;
use crate::ui::{self, TaskSpinner, UiContext};
use tokio::io::AsyncWriteExt;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> PackyardResult<()> {
    let ctx = UiContext::detect();
    let package = PackageRef::parse(&args.package)?;
    let resolver = super::resolver(config, false).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Resolving {}...", package));

    let artifact = match resolver
        .resolve(&package.name, &package.version, args.path.as_deref())
        .await
    {
        Ok(artifact) => artifact,
        Err(e) => {
            spinner.stop_error(&format!("Could not fetch {}", package));
            return Err(e);
        }
    };
    spinner.clear();

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &artifact.content)
                .await
                .map_err(|e| PackyardError::io(format!("writing {}", path.display()), e))?;
            ui::step_ok_detail(
                &ctx,
                &format!("Wrote {}", path.display()),
                &format!("{}@{} {}", artifact.package, artifact.version, artifact.file_name),
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&artifact.content)
                .await
                .map_err(|e| PackyardError::io("writing to stdout", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| PackyardError::io("writing to stdout", e))?;
        }
    }

    Ok(())
}
