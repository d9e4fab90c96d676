//! Device snapshot and status handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::error::AppError;
use crate::models::{DeviceSnapshot, ScheduleSlot};
use crate::poller;
use crate::state::BridgeState;

use super::SuccessResponse;

/// GET /api/devices - List all device snapshots
pub async fn list_devices(State(state): State<BridgeState>) -> impl IntoResponse {
    let snapshots = state.snapshots.read().await;
    let mut devices: Vec<DeviceSnapshot> = snapshots.values().cloned().collect();
    devices.sort_by(|a, b| a.device.device_id.cmp(&b.device.device_id));
    Json(devices)
}

/// GET /api/devices/:id - Get a single device snapshot
pub async fn get_device(
    State(state): State<BridgeState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .snapshot(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Device {} not found", id)))
}

/// GET /api/devices/:id/stats - Fetch live feeder stats from the cloud
pub async fn get_stats(
    State(state): State<BridgeState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.api.get_feeder_stats(&id).await?;
    Ok(Json(stats))
}

/// GET /api/devices/:id/attributes - Fetch live device attributes from the cloud
pub async fn get_attributes(
    State(state): State<BridgeState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attributes = state.api.get_device_attributes(&id).await?;
    Ok(Json(attributes))
}

/// GET /api/devices/:id/schedule - Feeding-schedule slots for a device
pub async fn get_schedule(
    State(state): State<BridgeState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attributes = state.api.get_device_attributes(&id).await?;
    let schedule: Vec<ScheduleSlot> = attributes.food_frames.unwrap_or_default();
    Ok(Json(schedule))
}

/// GET /api/status - Poll status and device count
pub async fn get_status(State(state): State<BridgeState>) -> impl IntoResponse {
    let status = state.poll_status.read().await.clone();
    let device_count = state.snapshots.read().await.len();

    Json(serde_json::json!({
        "device_count": device_count,
        "last_success": status.last_success,
        "last_error": status.last_error,
    }))
}

/// POST /api/poll - Trigger an immediate snapshot refresh
pub async fn trigger_poll(
    State(state): State<BridgeState>,
) -> Result<impl IntoResponse, AppError> {
    let count = poller::poll_once(&state).await?;

    tracing::info!("Manual poll refreshed {} devices", count);
    Ok(Json(SuccessResponse::new(format!(
        "Refreshed {} devices",
        count
    ))))
}
