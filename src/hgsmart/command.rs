//! Feed command encoding
//!
//! The cloud accepts manual feeds as a `userfoodframe` control frame: an
//! 8-hex-char value carrying the local minute-of-hour and the portion count,
//! wrapped in a JSON envelope with a millisecond timestamp and a time-based
//! message id. The node and clock-sequence of the message id are the fixed
//! constants the vendor mobile app stamps into its own requests, so only the
//! time component varies between invocations.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, Timelike};
use serde::Serialize;
use uuid::{Timestamp, Uuid};

/// Control frame identifier for manual feeding
pub const FOOD_FRAME_IDENTIFIER: &str = "userfoodframe";

/// Fixed prefix of every feed command value
pub const COMMAND_PREFIX: &str = "0120";

/// Node id the vendor app uses for feed message ids
const MESSAGE_NODE_ID: [u8; 6] = [0x8d, 0xd7, 0x11, 0x61, 0x77, 0x73];

/// Clock sequence the vendor app uses for feed message ids
const MESSAGE_CLOCK_SEQ: u16 = 0x8697;

/// 100-ns ticks between the Gregorian epoch (1582-10-15) and the Unix epoch
const GREGORIAN_UNIX_OFFSET: u64 = 0x01B2_1DD2_1381_4000;

/// Feed command envelope, serialized into the multipart `command` field
#[derive(Debug, Clone, Serialize)]
pub struct FeedCommand {
    pub ctrl: ControlFrame,
    pub ctrl_time: String,
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlFrame {
    pub identifier: String,
    pub value: String,
}

impl FeedCommand {
    /// Build the envelope for a manual feed of `portions` at the current time
    pub fn now(portions: u8) -> Self {
        Self {
            ctrl: ControlFrame {
                identifier: FOOD_FRAME_IDENTIFIER.to_string(),
                value: command_value(Local::now().minute(), portions),
            },
            ctrl_time: unix_millis().to_string(),
            message_id: message_id(),
        }
    }
}

/// Encode minute-of-hour and portion count into the 8-hex-char command value
pub fn command_value(minute: u32, portions: u8) -> String {
    format!("{}{:02x}{:02x}", COMMAND_PREFIX, minute, portions)
}

/// Time-based message id matching the vendor app: a v1 UUID with fixed
/// node/clock-sequence, rendered as 32 lowercase hex chars
pub fn message_id() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let ticks = (since_epoch.as_nanos() / 100) as u64 + GREGORIAN_UNIX_OFFSET;
    let ts = Timestamp::from_rfc4122(ticks, MESSAGE_CLOCK_SEQ);
    Uuid::new_v1(ts, &MESSAGE_NODE_ID).simple().to_string()
}

/// Milliseconds since the Unix epoch
fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_value_encoding() {
        assert_eq!(command_value(7, 5), "01200705");
        assert_eq!(command_value(0, 1), "01200001");
        assert_eq!(command_value(59, 9), "01203b09");
    }

    #[test]
    fn test_message_id_layout() {
        let id = message_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        // version nibble, then the fixed clock-sequence and node fields
        assert_eq!(&id[12..13], "1");
        assert_eq!(&id[16..20], "8697");
        assert_eq!(&id[20..], "8dd711617773");
    }

    #[test]
    fn test_message_id_is_time_ordered() {
        // A burst of ids lands within the same millisecond; the 100-ns time
        // component still makes every one distinct
        let ids: std::collections::HashSet<String> = (0..100).map(|_| message_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_feed_command_envelope() {
        let command = FeedCommand::now(5);
        assert_eq!(command.ctrl.identifier, "userfoodframe");
        assert_eq!(command.ctrl.value.len(), 8);
        assert!(command.ctrl.value.starts_with(COMMAND_PREFIX));
        assert!(command.ctrl.value.ends_with("05"));

        let minute = u32::from_str_radix(&command.ctrl.value[4..6], 16).unwrap();
        assert!(minute < 60);

        // ctrl_time is a decimal millisecond timestamp
        let millis: u128 = command.ctrl_time.parse().unwrap();
        assert!(millis > 1_600_000_000_000);
    }

    #[test]
    fn test_envelope_field_names() {
        let value = serde_json::to_value(FeedCommand::now(1)).unwrap();
        assert_eq!(value["ctrl"]["identifier"], "userfoodframe");
        assert!(value["ctrl"]["value"].is_string());
        assert!(value["ctrl_time"].is_string());
        assert!(value["message_id"].is_string());
    }
}
