//! Serve command - run the HTTP registry

use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::error::PackyardResult;
use crate::orchestration::create_sandbox;
use crate::server;
use crate::ui::{self, UiContext};
use std::sync::Arc;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> PackyardResult<()> {
    let ctx = UiContext::detect();

    // Cached builds stay servable without a runtime, so only warn
    let sandbox = create_sandbox(&config.sandbox)?;
    match sandbox.ensure_ready().await {
        Ok(()) => ui::step_ok_detail(&ctx, "Build sandbox ready", sandbox.runtime_name()),
        Err(e) => ui::step_warn_hint(
            &ctx,
            &format!("Build sandbox unavailable: {}", e),
            e.hint().unwrap_or("Only already built packages can be served"),
        ),
    }

    let resolver = super::resolver(config, args.ephemeral).await?;
    let bind = args.bind.as_deref().unwrap_or(&config.server.bind);

    ui::section(&ctx, "Packyard registry");
    ui::key_value(&ctx, "Repository", &config.upstream.repository);
    ui::key_value(&ctx, "Latest", &config.resolve.latest.to_string());
    ui::key_value(&ctx, "Listening", bind);

    server::serve(bind, Arc::new(resolver)).await
}
