//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    DRAIN_ACTIVE, DRAIN_DURATION, DRAIN_REQUESTS_TOTAL, QUEUE_DELIVERED_TOTAL,
    QUEUE_ENQUEUED_TOTAL, QUEUE_EVICTED_TOTAL, QUEUE_FAILED_ATTEMPTS_TOTAL, QUEUE_LENGTH,
    STORE_READ_ERRORS_TOTAL, STORE_WRITE_ERRORS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording queue metrics
pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_enqueued() {
        QUEUE_ENQUEUED_TOTAL.inc();
    }

    pub fn record_delivered() {
        QUEUE_DELIVERED_TOTAL.inc();
    }

    pub fn record_failed_attempt() {
        QUEUE_FAILED_ATTEMPTS_TOTAL.inc();
    }

    pub fn record_evicted(count: u64) {
        if count > 0 {
            QUEUE_EVICTED_TOTAL.inc_by(count);
        }
    }

    pub fn set_length(length: usize) {
        QUEUE_LENGTH.set(length as i64);
    }
}

/// Helper struct for recording drain pass metrics
pub struct DrainMetrics;

impl DrainMetrics {
    /// Record a drain request that did not start a pass
    pub fn record_skipped(reason: &str) {
        DRAIN_REQUESTS_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a completed drain pass
    pub fn record_completed(duration: Duration) {
        DRAIN_REQUESTS_TOTAL.with_label_values(&["completed"]).inc();
        DRAIN_DURATION.observe(duration.as_secs_f64());
    }

    pub fn set_active(active: bool) {
        DRAIN_ACTIVE.set(if active { 1 } else { 0 });
    }
}

/// Helper struct for recording store metrics
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn record_read_error() {
        STORE_READ_ERRORS_TOTAL.inc();
    }

    pub fn record_write_error() {
        STORE_WRITE_ERRORS_TOTAL.inc();
    }
}
