//! Data models for hgsmart-bridge
//!
//! Vendor payloads are validated into typed records at the API boundary.
//! Fields the bridge does not interpret are preserved verbatim in the
//! flattened `extra` maps so reads stay lossless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of feeding-schedule slots per device (numbered 0-5)
pub const SCHEDULE_SLOTS: u8 = 6;

/// Vendor-documented portion range for a single feed command
pub const MIN_PORTIONS: u8 = 1;
pub const MAX_PORTIONS: u8 = 9;

// ============================================================================
// Vendor records
// ============================================================================

/// One device from the account device list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(rename = "fwVersion", default)]
    pub fw_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceRecord {
    /// Display name: vendor name with whitespace collapsed, truncated to 50 chars
    pub fn display_name(&self) -> String {
        let raw = self
            .name
            .clone()
            .unwrap_or_else(|| format!("Device {}", self.device_id));
        let clean = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if clean.chars().count() > 50 {
            let head: String = clean.chars().take(47).collect();
            format!("{}...", head)
        } else {
            clean
        }
    }

    /// Device model with whitespace collapsed
    pub fn model(&self) -> String {
        let raw = self
            .device_type
            .clone()
            .unwrap_or_else(|| "Pet Feeder".to_string());
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Feeder summary: remaining food level and desiccant expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeederStats {
    #[serde(rename = "surplusGrain", default)]
    pub surplus_grain: Option<i64>,
    #[serde(rename = "desiccantLeftDays", default)]
    pub desiccant_left_days: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Device attribute map, including the feeding schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAttributes {
    #[serde(rename = "foodFrames", default)]
    pub food_frames: Option<Vec<ScheduleSlot>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One feeding-schedule slot (slot index 0-5)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub slot: u8,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub portions: Option<u8>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

// ============================================================================
// Bridge-side records
// ============================================================================

/// Cached per-device state assembled by the poller
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub device: DeviceRecord,
    pub stats: Option<FeederStats>,
    pub attributes: Option<DeviceAttributes>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Request models
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct FeedRequest {
    #[serde(default)]
    pub portions: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct FeedDispatchRequest {
    pub device_ids: Vec<String>,
    #[serde(default)]
    pub portions: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct SetPortionsRequest {
    pub portions: u8,
}
