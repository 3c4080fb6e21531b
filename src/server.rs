//! HTTP endpoint that triggers a mirror run.
//!
//! - `POST /download?prefix=<p>` -> mirrors the prefix, answers plain text
//! - `GET  /healthz`             -> liveness ("ok")

use crate::orchestrator::Mirror;
use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Query parameters of `POST /download`.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub prefix: Option<String>,
}

/// Build the router. The mirror is shared state for all handlers.
pub fn routes() -> Router<Mirror> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/download", post(start_download))
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

/// `POST /download?prefix=...`
///
/// Runs the mirror to completion before answering. Objects that failed or
/// await a restore do not change the answer; only a listing failure does.
pub async fn start_download(
    State(mirror): State<Mirror>,
    Query(query): Query<DownloadQuery>,
) -> (StatusCode, String) {
    let prefix = match query.prefix {
        Some(prefix) if !prefix.trim().is_empty() => prefix,
        _ => {
            warn!("Download request received without a prefix");
            return (
                StatusCode::BAD_REQUEST,
                "Error: prefix parameter is required. Example: /download?prefix=backup/2024/"
                    .to_string(),
            );
        }
    };

    info!(
        "Received download request for prefix '{}' in bucket '{}'",
        prefix,
        mirror.config().bucket
    );
    match mirror.download_prefix(&prefix).await {
        Ok(report) => {
            info!(
                "Download process finished for prefix '{}' ({} downloaded, {} awaiting restore, {} failed)",
                prefix,
                report.downloaded.len(),
                report.restore_requested.len(),
                report.failures.len()
            );
            (
                StatusCode::OK,
                format!("Download process started for prefix: {}", prefix),
            )
        }
        Err(e) => {
            error!("Error during download for prefix '{}': {}", prefix, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error starting download for prefix: {} ({})", prefix, e),
            )
        }
    }
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(mirror: Mirror, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, routes().with_state(mirror)).await?;
    Ok(())
}
