//! Procedure export submission endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::export::{ProcedureRecord, SubmitOutcome};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub record: ProcedureRecord,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
}

/// POST /api/v1/exports
#[tracing::instrument(name = "http.submit_export", skip(state, request))]
pub async fn submit_export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<ExportResponse>> {
    let outcome = state
        .submitter
        .submit(&request.webhook_url, &request.record)
        .await?;

    Ok(Json(ExportResponse {
        success: true,
        message: outcome.message().to_string(),
        outcome,
    }))
}
