//! Feed command and manual-portion handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::error::AppError;
use crate::hgsmart::ApiError;
use crate::models::{FeedDispatchRequest, FeedRequest, SetPortionsRequest, MAX_PORTIONS, MIN_PORTIONS};
use crate::state::BridgeState;

use super::SuccessResponse;

#[derive(Serialize)]
pub struct FeedResponse {
    pub message: String,
    pub devices: Vec<String>,
    pub portions: u8,
}

/// POST /api/devices/:id/feed - Feed a single device
///
/// Body `{"portions": n}` is optional; without it the stored manual portion
/// count for the device is used.
pub async fn feed_device(
    State(state): State<BridgeState>,
    Path(id): Path<String>,
    body: Option<Json<FeedRequest>>,
) -> Result<impl IntoResponse, AppError> {
    if !state.knows_device(&id).await {
        return Err(AppError::NotFound(format!(
            "Device {} is not a known HGSmart feeder",
            id
        )));
    }

    let requested = body.and_then(|Json(req)| req.portions);
    let portions = match requested {
        Some(portions) => portions,
        None => state.manual_portions_for(&id).await,
    };
    validate_portions(portions)?;

    state
        .api
        .send_feed_command(&id, portions)
        .await
        .map_err(|e| feed_error(&id, e))?;

    Ok(Json(FeedResponse {
        message: format!("Fed {} portions to {}", portions, id),
        devices: vec![id],
        portions,
    }))
}

/// POST /api/feed - Dispatch a feed command to multiple devices
///
/// Unknown device ids are skipped with a warning; zero resolvable devices is
/// an explicit failure, never a silent no-op.
pub async fn feed_dispatch(
    State(state): State<BridgeState>,
    Json(request): Json<FeedDispatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.device_ids.is_empty() {
        return Err(AppError::BadRequest(
            "No devices specified in target".to_string(),
        ));
    }

    let portions = request.portions.unwrap_or(MIN_PORTIONS);
    validate_portions(portions)?;

    let mut resolved = Vec::new();
    {
        let snapshots = state.snapshots.read().await;
        for id in &request.device_ids {
            if snapshots.contains_key(id) {
                resolved.push(id.clone());
            } else {
                tracing::warn!("Device {} is not a known HGSmart feeder - skipping", id);
            }
        }
    }

    if resolved.is_empty() {
        return Err(AppError::NotFound(
            "None of the requested devices are known HGSmart feeders".to_string(),
        ));
    }

    for id in &resolved {
        state
            .api
            .send_feed_command(id, portions)
            .await
            .map_err(|e| feed_error(id, e))?;
    }

    tracing::info!(
        "Feed dispatched to {} devices ({} portions)",
        resolved.len(),
        portions
    );

    Ok(Json(FeedResponse {
        message: format!("Fed {} portions to {} devices", portions, resolved.len()),
        devices: resolved,
        portions,
    }))
}

/// GET /api/devices/:id/portions - Stored manual portion count
pub async fn get_portions(
    State(state): State<BridgeState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.knows_device(&id).await {
        return Err(AppError::NotFound(format!("Device {} not found", id)));
    }

    let portions = state.manual_portions_for(&id).await;
    Ok(Json(serde_json::json!({
        "device_id": id,
        "portions": portions,
    })))
}

/// PUT /api/devices/:id/portions - Store the manual portion count
pub async fn set_portions(
    State(state): State<BridgeState>,
    Path(id): Path<String>,
    Json(request): Json<SetPortionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !state.knows_device(&id).await {
        return Err(AppError::NotFound(format!("Device {} not found", id)));
    }
    validate_portions(request.portions)?;

    state.set_manual_portions(&id, request.portions).await;

    Ok(Json(SuccessResponse::new(format!(
        "Manual portions for {} set to {}",
        id, request.portions
    ))))
}

fn validate_portions(portions: u8) -> Result<(), AppError> {
    if !(MIN_PORTIONS..=MAX_PORTIONS).contains(&portions) {
        return Err(AppError::BadRequest(format!(
            "Portions must be between {} and {}",
            MIN_PORTIONS, MAX_PORTIONS
        )));
    }
    Ok(())
}

/// Surface a failed feed command as an error naming the device
fn feed_error(device_id: &str, err: ApiError) -> AppError {
    match err {
        ApiError::Auth(msg) => AppError::VendorAuth(msg),
        other => AppError::VendorError(format!(
            "Feed command failed for device {}: {}",
            device_id, other
        )),
    }
}
