//! Offline queue endpoints.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::delivery::{DrainOutcome, DrainReport};
use crate::error::{AppError, Result};
use crate::queue::{QueueItem, QueueKind};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    #[serde(alias = "type")]
    pub kind: QueueKind,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub id: String,
    pub length: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub length: usize,
    pub is_processing: bool,
    pub max_retries: u32,
    pub oldest_enqueued_at: Option<DateTime<Utc>>,
    /// Items in FIFO order, in their stored form
    pub items: Vec<QueueItem>,
}

#[derive(Debug, Serialize)]
pub struct ClearQueueResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct DrainResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DrainReport>,
}

/// GET /api/v1/queue
pub async fn get_queue(State(state): State<AppState>) -> Json<QueueResponse> {
    let items = state.queue.snapshot();
    let stats = state.queue.stats();

    Json(QueueResponse {
        length: items.len(),
        is_processing: state.processor.is_processing(),
        max_retries: stats.max_retries,
        oldest_enqueued_at: stats.oldest_enqueued_at,
        items,
    })
}

/// POST /api/v1/queue
#[tracing::instrument(name = "http.enqueue_item", skip(state, request), fields(kind = %request.kind))]
pub async fn enqueue_item(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    if !request.data.is_object() {
        return Err(AppError::Validation(
            "Queue item data must be a JSON object".to_string(),
        ));
    }

    let id = state.queue.enqueue(request.kind, request.data);

    Ok((
        StatusCode::CREATED,
        Json(EnqueueResponse {
            id,
            length: state.queue.len(),
        }),
    ))
}

/// DELETE /api/v1/queue
#[tracing::instrument(name = "http.clear_queue", skip(state))]
pub async fn clear_queue(State(state): State<AppState>) -> Json<ClearQueueResponse> {
    Json(ClearQueueResponse {
        cleared: state.queue.clear(),
    })
}

/// POST /api/v1/queue/drain - request a pass now, subject to the usual guard
#[tracing::instrument(name = "http.drain_queue", skip(state))]
pub async fn drain_queue(State(state): State<AppState>) -> Json<DrainResponse> {
    let outcome = state.processor.drain().await;
    let name = outcome.as_str();
    let report = match outcome {
        DrainOutcome::Completed(report) => Some(report),
        _ => None,
    };

    Json(DrainResponse {
        outcome: name,
        report,
    })
}
