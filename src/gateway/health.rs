use crate::config::HealthConfig;
use crate::session::SessionStore;
use anyhow::Context;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

/// Request timeout for health handlers.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Shared state for the health handlers.
#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn SessionStore>,
    /// Raised by the gateway while it is polling.
    pub ready: Arc<AtomicBool>,
}

/// GET /health/liveness: the process is up.
pub async fn handle_liveness() -> impl IntoResponse {
    Json(serde_json::json!({"status": "UP"}))
}

/// GET /health/readiness: the gateway is polling and the store answers.
pub async fn handle_readiness(State(state): State<HealthState>) -> impl IntoResponse {
    if !state.ready.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "NOT_READY", "reason": "gateway not polling"})),
        );
    }

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "READY",
                "store": state.store.backend_name(),
            })),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check: store ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "NOT_READY", "reason": "store unavailable"})),
            )
        }
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health/liveness", get(handle_liveness))
        .route("/health/readiness", get(handle_readiness))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Serve the health endpoints until `shutdown` fires.
pub async fn serve(
    config: &HealthConfig,
    state: HealthState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    // Tuple form resolves hostnames as well as IPv4/IPv6 literals.
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind health endpoint on {}:{}", config.host, config.port))?;
    tracing::info!(addr = %listener.local_addr()?, "health endpoint listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
