//! Shared bridge state
//!
//! One `BridgeState` is built per configured account, owned by `main` and
//! handed explicitly to the poller and every request handler. There is no
//! process-wide registry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::hgsmart::HgSmartClient;
use crate::models::{DeviceSnapshot, MIN_PORTIONS};

#[derive(Clone)]
pub struct BridgeState {
    pub api: Arc<HgSmartClient>,
    pub snapshots: Arc<RwLock<HashMap<String, DeviceSnapshot>>>,
    /// Per-device portion count used when a feed request carries none
    pub manual_portions: Arc<RwLock<HashMap<String, u8>>>,
    pub poll_status: Arc<RwLock<PollStatus>>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PollStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl BridgeState {
    pub fn new(api: Arc<HgSmartClient>) -> Self {
        Self {
            api,
            snapshots: Arc::new(RwLock::new(HashMap::new())),
            manual_portions: Arc::new(RwLock::new(HashMap::new())),
            poll_status: Arc::new(RwLock::new(PollStatus::default())),
        }
    }

    pub async fn snapshot(&self, device_id: &str) -> Option<DeviceSnapshot> {
        self.snapshots.read().await.get(device_id).cloned()
    }

    pub async fn knows_device(&self, device_id: &str) -> bool {
        self.snapshots.read().await.contains_key(device_id)
    }

    /// Stored manual portion count for a device (defaults to one portion)
    pub async fn manual_portions_for(&self, device_id: &str) -> u8 {
        self.manual_portions
            .read()
            .await
            .get(device_id)
            .copied()
            .unwrap_or(MIN_PORTIONS)
    }

    pub async fn set_manual_portions(&self, device_id: &str, portions: u8) {
        self.manual_portions
            .write()
            .await
            .insert(device_id.to_string(), portions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hgsmart::DEFAULT_BASE_URL;

    fn test_state() -> BridgeState {
        BridgeState::new(Arc::new(HgSmartClient::new(
            DEFAULT_BASE_URL,
            "user",
            "password",
        )))
    }

    #[test]
    fn test_manual_portions_default_and_override() {
        let state = test_state();

        tokio_test::block_on(async {
            assert_eq!(state.manual_portions_for("fd-01").await, MIN_PORTIONS);

            state.set_manual_portions("fd-01", 4).await;
            assert_eq!(state.manual_portions_for("fd-01").await, 4);
            // other devices keep the default
            assert_eq!(state.manual_portions_for("fd-02").await, MIN_PORTIONS);
        });
    }

    #[test]
    fn test_unknown_device_has_no_snapshot() {
        let state = test_state();

        tokio_test::block_on(async {
            assert!(!state.knows_device("fd-01").await);
            assert!(state.snapshot("fd-01").await.is_none());
        });
    }
}
