//! Route handlers
//!
//! Resolution errors that mean "no such package, version or file" become 404;
//! everything else is logged and answered with a short 500 body.

use crate::error::PackyardError;
use crate::resolve::{PackageRef, RequestedVersion, ResolvedArtifact, LATEST};
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

pub async fn healthz() -> &'static str {
    "ok"
}

/// Advisory listing, one package per line
pub async fn index(State(state): State<AppState>) -> String {
    let mut body = state.resolver.list_latest_packages().await.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    body
}

/// `/packages/<name>` or `/packages/<name>@<version>`
pub async fn package_root(State(state): State<AppState>, Path(spec): Path<String>) -> Response {
    if !spec.contains('@') {
        let location = format!("/packages/{}@{}", spec, LATEST);
        return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    }
    serve_artifact(&state, &spec, None).await
}

/// `/packages/<name>@<version>/<path>`
pub async fn package_file(
    State(state): State<AppState>,
    Path((spec, path)): Path<(String, String)>,
) -> Response {
    serve_artifact(&state, &spec, Some(&path)).await
}

async fn serve_artifact(state: &AppState, spec: &str, path: Option<&str>) -> Response {
    let package = match PackageRef::parse(spec) {
        Ok(package) => package,
        Err(_) => return not_found(),
    };

    match state
        .resolver
        .resolve(&package.name, &package.version, path)
        .await
    {
        Ok(artifact) => artifact_response(artifact),
        Err(e) => error_response(&package.name, &package.version, e),
    }
}

fn artifact_response(artifact: ResolvedArtifact) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name),
            ),
        ],
        artifact.content,
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

fn error_response(package: &str, version: &RequestedVersion, err: PackyardError) -> Response {
    if err.is_not_found() {
        warn!("{}@{}: {}", package, version, err);
        return not_found();
    }

    error!("{}@{}: {}", package, version, err);
    let message = match err {
        PackyardError::UpstreamRequest { .. }
        | PackyardError::UpstreamStatus { .. }
        | PackyardError::UpstreamDecode { .. }
        | PackyardError::NoLatestVersion => "upstream unavailable",
        PackyardError::BuildFailed { .. }
        | PackyardError::ManifestLine(_)
        | PackyardError::EmptyManifest { .. }
        | PackyardError::BuildTimeout { .. } => "build failed",
        _ => "internal error",
    };
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}
