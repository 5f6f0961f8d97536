//! HTTP front-end
//!
//! Plain-text routes over the [`Resolver`]:
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /packages/<name>` | 302 to `/packages/<name>@latest` |
//! | `GET /packages/<name>@<version>` | primary artifact |
//! | `GET /packages/<name>@<version>/<path>` | named artifact |
//! | `GET /`, `GET /packages` | packages of the latest version |
//! | `GET /healthz` | `ok` |

mod handlers;

use crate::error::{PackyardError, PackyardResult};
use crate::resolve::Resolver;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route("/packages", get(handlers::index))
        .route("/packages/", get(handlers::index))
        .route("/packages/:spec", get(handlers::package_root))
        .route("/packages/:spec/*path", get(handlers::package_file))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Serve until Ctrl-C
pub async fn serve(bind: &str, resolver: Arc<Resolver>) -> PackyardResult<()> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| PackyardError::io(format!("binding {}", bind), e))?;
    let local = listener
        .local_addr()
        .map_err(|e| PackyardError::io("reading listener address", e))?;
    info!("Listening on http://{}", local);

    axum::serve(listener, router(AppState { resolver }))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| PackyardError::io("serving HTTP", e))
}
