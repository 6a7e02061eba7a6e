//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::connectivity::ConnectivitySignal;
use crate::delivery::ProcessorStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub online: bool,
    pub queue: QueueHealthResponse,
    pub delivery: ProcessorStatsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct QueueHealthResponse {
    pub length: usize,
    pub retrying_items: usize,
    pub is_processing: bool,
    pub pending_writes: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.queue.stats();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        online: state.connectivity.is_online(),
        queue: QueueHealthResponse {
            length: stats.total_items,
            retrying_items: stats.retrying_items,
            is_processing: state.processor.is_processing(),
            pending_writes: state.queue.has_pending_writes(),
        },
        delivery: state.processor.stats(),
    })
}
