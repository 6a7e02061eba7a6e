use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::connectivity::{get_connectivity, set_connectivity};
use super::exports::submit_export;
use super::health::health;
use super::metrics::prometheus_metrics;
use super::queue::{clear_queue, drain_queue, enqueue_item, get_queue};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Offline queue
                .route(
                    "/queue",
                    get(get_queue).post(enqueue_item).delete(clear_queue),
                )
                .route("/queue/drain", post(drain_queue))
                // Export submission
                .route("/exports", post(submit_export))
                // Connectivity
                .route(
                    "/connectivity",
                    get(get_connectivity).put(set_connectivity),
                ),
        )
}
