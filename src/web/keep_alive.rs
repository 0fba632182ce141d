use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

use crate::logging::SharedLogBuffer;
use crate::state::SharedEventRegistry;

/// Most log lines returned by one `/logs` request
const MAX_LOG_LINES: usize = 1000;

/// Shared state for keep-alive handlers
#[derive(Clone)]
pub struct KeepAliveState {
    pub registry: SharedEventRegistry,
    pub log_buffer: SharedLogBuffer,
    pub started_at: Instant,
}

#[derive(Deserialize)]
pub struct LogsParams {
    count: Option<usize>,
}

pub fn router(state: KeepAliveState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/logs", get(logs))
        .with_state(state)
}

/// Serve the keep-alive endpoints until the process exits
pub async fn start_keep_alive_server(port: u16, state: KeepAliveState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Keep-alive server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET / - liveness for uptime pingers
async fn index() -> &'static str {
    "PT signup bot is running"
}

/// GET /health - registry counters
async fn health(State(state): State<KeepAliveState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "events": state.registry.event_count(),
        "pending_swaps": state.registry.pending_swap_count(),
    }))
}

/// GET /logs?count=N - recent captured log lines
async fn logs(
    State(state): State<KeepAliveState>,
    Query(params): Query<LogsParams>,
) -> Json<Vec<serde_json::Value>> {
    let count = params.count.unwrap_or(100).min(MAX_LOG_LINES);
    Json(
        state
            .log_buffer
            .get_recent(count)
            .iter()
            .map(|entry| entry.to_json())
            .collect(),
    )
}
