//! HTTP endpoint serving the registry to Prometheus.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use nut_exporter_core::{EXPOSITION_CONTENT_TYPE, SeriesRegistry, span_names};
use tokio::net::TcpListener;

use crate::error::CliError;

/// Routes: `/metrics` and `/health`
pub fn router(registry: Arc<SeriesRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(registry)
}

/// Serves until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`CliError::Server`] if the server stops with an I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    registry: Arc<SeriesRegistry>,
    shutdown: F,
) -> Result<(), CliError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CliError::Server(e.to_string()))
}

async fn metrics_handler(State(registry): State<Arc<SeriesRegistry>>) -> Response {
    let span = tracing::debug_span!(span_names::SCRAPE);
    match span.in_scope(|| registry.encode()) {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

async fn health_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}
