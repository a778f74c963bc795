//! HTTP server: router, webhook endpoint, graceful shutdown.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::events::EventDispatcher;
use crate::health;
use crate::signature::SignatureVerifier;

/// Shared, read-only state; cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub dispatcher: Arc<EventDispatcher>,
    pub started_at: Instant,
}

pub fn build_router(state: AppState, events_path: &str) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route(events_path, post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn run(
    bind_address: &str,
    port: u16,
    events_path: &str,
    state: AppState,
) -> anyhow::Result<()> {
    let addr = format!("{bind_address}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, path = events_path, "webhook server listening");

    let app = build_router(state, events_path);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// One webhook delivery. The whole body is buffered up front so the
/// signature is computed over exactly the bytes the dispatcher will
/// parse; verification consumes nothing.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("webhook", %request_id);

    async move {
        // The gate runs before the payload is interpreted in any way.
        if let Err(err) = state.verifier.verify(&headers, &body) {
            warn!(error = %err, "rejecting webhook delivery");
            let status = if err.is_unauthorized() {
                StatusCode::UNAUTHORIZED
            } else {
                StatusCode::BAD_REQUEST
            };
            return status.into_response();
        }
        state.dispatcher.dispatch(&body).await
    }
    .instrument(span)
    .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received, stopping gracefully"),
        Err(err) => warn!(error = %err, "failed to listen for shutdown signal"),
    }
}
