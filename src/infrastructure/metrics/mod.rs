//! Prometheus metrics for the export queue.
//!
//! - Queue metrics (enqueued, delivered, failed attempts, evicted, length)
//! - Drain pass metrics (passes by outcome, pass duration)
//! - Store health (read and write failures)
//! - Connectivity state

mod helpers;

pub use helpers::{encode_metrics, DrainMetrics, QueueMetrics, StoreMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "export_queue";

lazy_static! {
    // ============================================================================
    // Queue Metrics
    // ============================================================================

    /// Items added to the offline queue
    pub static ref QUEUE_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_enqueued_total", METRIC_PREFIX),
        "Total items added to the offline queue"
    ).unwrap();

    /// Items delivered and removed from the queue
    pub static ref QUEUE_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_delivered_total", METRIC_PREFIX),
        "Total queued items delivered successfully"
    ).unwrap();

    /// Failed delivery attempts (each increments an item's retry count)
    pub static ref QUEUE_FAILED_ATTEMPTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_failed_attempts_total", METRIC_PREFIX),
        "Total failed delivery attempts"
    ).unwrap();

    /// Items dropped after reaching the retry ceiling
    pub static ref QUEUE_EVICTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_evicted_total", METRIC_PREFIX),
        "Total items evicted after reaching the retry ceiling"
    ).unwrap();

    /// Current number of queued items
    pub static ref QUEUE_LENGTH: IntGauge = register_int_gauge!(
        format!("{}_length", METRIC_PREFIX),
        "Current number of items in the offline queue"
    ).unwrap();

    // ============================================================================
    // Drain Metrics
    // ============================================================================

    /// Drain requests by outcome (completed, offline, empty, already_draining)
    pub static ref DRAIN_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_drain_requests_total", METRIC_PREFIX),
        "Drain requests by outcome",
        &["outcome"]
    ).unwrap();

    /// Wall time of completed drain passes
    pub static ref DRAIN_DURATION: Histogram = register_histogram!(
        format!("{}_drain_duration_seconds", METRIC_PREFIX),
        "Duration of completed drain passes in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0]
    ).unwrap();

    /// 1 while a drain pass is running
    pub static ref DRAIN_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_drain_active", METRIC_PREFIX),
        "Whether a drain pass is currently running (1=draining, 0=idle)"
    ).unwrap();

    // ============================================================================
    // Store Metrics
    // ============================================================================

    /// Failed reads or decodes of the persisted queue
    pub static ref STORE_READ_ERRORS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_store_read_errors_total", METRIC_PREFIX),
        "Total failures reading or decoding the persisted queue"
    ).unwrap();

    /// Failed writes of the persisted queue
    pub static ref STORE_WRITE_ERRORS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_store_write_errors_total", METRIC_PREFIX),
        "Total failures writing the persisted queue"
    ).unwrap();

    // ============================================================================
    // Connectivity
    // ============================================================================

    /// Connectivity status (1 = online, 0 = offline)
    pub static ref CONNECTIVITY_ONLINE: IntGauge = register_int_gauge!(
        format!("{}_connectivity_online", METRIC_PREFIX),
        "Connectivity status (1=online, 0=offline)"
    ).unwrap();
}
