//! Tags and packages commands - inspect the package repository

use crate::cli::args::PackagesArgs;
use crate::config::Config;
use crate::error::PackyardResult;
use crate::resolve::RequestedVersion;
use crate::ui::{self, UiContext};

/// List version tags in upstream order
pub async fn tags(config: &Config) -> PackyardResult<()> {
    let store = super::open_store(config, false).await?;
    let versions = super::version_resolver(config, store)?;

    for tag in versions.list_tags().await? {
        println!("{}", tag);
    }
    Ok(())
}

/// List packages of a version (latest by default)
pub async fn packages(args: PackagesArgs, config: &Config) -> PackyardResult<()> {
    let ctx = UiContext::detect();
    let store = super::open_store(config, false).await?;
    let versions = super::version_resolver(config, store)?;

    let requested = match args.at {
        Some(v) => v.parse()?,
        None => RequestedVersion::Latest,
    };
    let version = match requested {
        RequestedVersion::Latest => versions.resolve_latest().await?,
        RequestedVersion::Concrete(v) => v,
    };

    ui::key_value(&ctx, "Version", &version);
    for package in versions.list_packages(&version).await? {
        println!("{}", package);
    }
    Ok(())
}
