//! Axum HTTP surface: liveness at `/` and a JSON `/health` report.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use learnverse_ratelimit::RegistryStats;
use learnverse_settings::{FeatureFlags, FlagSource};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::gate::BackpressureGate;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Admission control, for limiter snapshots.
    pub gate: Arc<BackpressureGate>,
    /// Feature flags as the bot currently sees them.
    pub flags: Arc<dyn FlagSource>,
    /// When the process started.
    pub start_time: Instant,
}

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: &'static str,
    /// Seconds since start.
    pub uptime_secs: u64,
    /// Published bot version from the config service.
    pub version: String,
    /// Effective feature flags.
    pub flags: FeatureFlags,
    /// One snapshot per rate-limit registry.
    pub limiters: Vec<RegistryStats>,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve `router(state)` on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "health server listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
}

/// GET /
async fn root_handler() -> &'static str {
    "Learnverse bot is running"
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.flags.current().await;
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        version: config.version,
        flags: config.feature_flags,
        limiters: state.gate.stats().into(),
    })
}
