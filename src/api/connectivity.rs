//! Connectivity status endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::config::ConnectivityMode;
use crate::connectivity::ConnectivitySignal;
use crate::error::{AppError, Result};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ConnectivityResponse {
    pub online: bool,
    pub mode: ConnectivityMode,
    /// Whether this request flipped the state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetConnectivityRequest {
    pub online: bool,
}

/// GET /api/v1/connectivity
pub async fn get_connectivity(State(state): State<AppState>) -> Json<ConnectivityResponse> {
    Json(ConnectivityResponse {
        online: state.connectivity.is_online(),
        mode: state.settings.connectivity.mode,
        changed: None,
    })
}

/// PUT /api/v1/connectivity - only in manual mode; the probe owns the flag otherwise
#[tracing::instrument(name = "http.set_connectivity", skip(state), fields(online = request.online))]
pub async fn set_connectivity(
    State(state): State<AppState>,
    Json(request): Json<SetConnectivityRequest>,
) -> Result<Json<ConnectivityResponse>> {
    if state.settings.connectivity.mode != ConnectivityMode::Manual {
        return Err(AppError::Validation(
            "Connectivity can only be set in manual mode".to_string(),
        ));
    }

    let changed = state.connectivity.set_online(request.online);

    Ok(Json(ConnectivityResponse {
        online: state.connectivity.is_online(),
        mode: state.settings.connectivity.mode,
        changed: Some(changed),
    }))
}
