//! Periodic snapshot refresh from the HGSmart cloud
//!
//! Runs in a background tokio task. Every update interval, lists the
//! account's devices, fetches per-device stats and attributes, and replaces
//! the in-memory snapshot map. `poll_once` is also callable from the REST
//! layer for a manual refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;

use crate::hgsmart::ApiError;
use crate::models::DeviceSnapshot;
use crate::state::BridgeState;

pub struct FeederPoller {
    state: BridgeState,
    poll_interval: Duration,
}

impl FeederPoller {
    pub fn new(state: BridgeState, poll_interval: Duration) -> Self {
        Self {
            state,
            poll_interval,
        }
    }

    /// Start the poll loop (runs forever)
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "[Poller] Starting snapshot refresh (interval: {:?})",
            self.poll_interval
        );

        let mut timer = interval(self.poll_interval);

        loop {
            timer.tick().await;

            if let Err(e) = poll_once(&self.state).await {
                tracing::error!("[Poller] Refresh cycle failed: {}", e);
            }
        }
    }
}

/// Fetch all devices with their stats and attributes, replacing the snapshot
/// map. Returns the number of devices seen.
pub async fn poll_once(state: &BridgeState) -> Result<usize, ApiError> {
    match refresh_snapshots(state).await {
        Ok(count) => {
            let mut status = state.poll_status.write().await;
            status.last_success = Some(Utc::now());
            status.last_error = None;
            Ok(count)
        }
        Err(e) => {
            state.poll_status.write().await.last_error = Some(e.to_string());
            Err(e)
        }
    }
}

async fn refresh_snapshots(state: &BridgeState) -> Result<usize, ApiError> {
    let devices = match state.api.list_devices().await {
        Ok(devices) => devices,
        Err(ApiError::Auth(msg)) => {
            // The client already tried refresh-and-retry; a surviving auth
            // failure means the session is gone. Re-authenticate once.
            tracing::warn!("[Poller] Session lost ({}), re-authenticating", msg);
            state.api.authenticate().await?;
            state.api.list_devices().await?
        }
        Err(e) => return Err(e),
    };

    let mut snapshots = HashMap::with_capacity(devices.len());

    for device in devices {
        let device_id = device.device_id.clone();

        let (stats, attributes) = tokio::join!(
            state.api.get_feeder_stats(&device_id),
            state.api.get_device_attributes(&device_id),
        );

        let stats = match stats {
            Ok(stats) => Some(stats),
            Err(ApiError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!("[Poller] Stats fetch failed for {}: {}", device_id, e);
                None
            }
        };

        let attributes = match attributes {
            Ok(attributes) => Some(attributes),
            Err(ApiError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!("[Poller] Attributes fetch failed for {}: {}", device_id, e);
                None
            }
        };

        snapshots.insert(
            device_id,
            DeviceSnapshot {
                device,
                stats,
                attributes,
                updated_at: Utc::now(),
            },
        );
    }

    let count = snapshots.len();
    *state.snapshots.write().await = snapshots;
    tracing::debug!("[Poller] Snapshot refreshed for {} devices", count);

    Ok(count)
}
