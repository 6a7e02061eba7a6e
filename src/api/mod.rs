//! API layer - HTTP endpoint handlers organized by resource.

mod connectivity;
mod exports;
mod health;
mod metrics;
mod queue;
mod routes;

// Re-export all handlers for use in server/app.rs
pub use connectivity::{get_connectivity, set_connectivity, ConnectivityResponse, SetConnectivityRequest};
pub use exports::{submit_export, ExportRequest, ExportResponse};
pub use health::{health, HealthResponse, QueueHealthResponse};
pub use metrics::prometheus_metrics;
pub use queue::{
    clear_queue, drain_queue, enqueue_item, get_queue, ClearQueueResponse, DrainResponse,
    EnqueueRequest, EnqueueResponse, QueueResponse,
};
pub use routes::api_routes;
