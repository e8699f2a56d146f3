//! Activity event record and its JSON codec.
//!
//! Events arrive on the bus as JSON documents produced by the desktop
//! tracker. Decoding is strict: a missing or mistyped field fails the
//! message, and the caller is expected to log and skip it rather than stop
//! the stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single user-activity event as produced by the upstream tracker.
///
/// Immutable once decoded; `activity_uuid` is globally unique and serves as
/// the primary key in the destination table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub activity_uuid: String,
    /// Stored in the `user_uid` column; the wire field is `user_id`.
    #[serde(rename = "user_id")]
    pub user_uid: String,
    pub organization_id: String,
    pub timestamp: DateTime<Utc>,
    pub app_name: String,
    pub url: String,
    pub page_title: String,
    pub productivity_status: String,
    /// AM/PM half-day marker.
    pub meridian: String,
    pub ip_address: String,
    pub mac_address: String,
    pub mouse_movement: bool,
    pub mouse_clicks: i32,
    pub keys_clicks: i32,
    pub status: i32,
    pub cpu_usage: String,
    pub ram_usage: String,
    pub screenshot_uid: String,
    pub thumbnail_uid: String,
    pub device_user_name: String,
}

/// Decode a raw bus payload into an [`ActivityEvent`].
pub fn decode_event(payload: &[u8]) -> Result<ActivityEvent> {
    let event = serde_json::from_slice(payload)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::testing::sample_event_json;

    #[test]
    fn test_decode_well_formed_event() {
        let payload = sample_event_json("a1", "u1");
        let event = decode_event(payload.as_bytes()).unwrap();

        assert_eq!(event.activity_uuid, "a1");
        assert_eq!(event.user_uid, "u1");
        assert_eq!(event.app_name, "firefox");
        assert!(event.mouse_movement);
        assert_eq!(event.mouse_clicks, 12);
        assert_eq!(event.timestamp.timestamp(), 1735689600);
    }

    #[test]
    fn test_decode_maps_user_id_wire_field() {
        let payload = sample_event_json("a1", "user-42");
        let event = decode_event(payload.as_bytes()).unwrap();
        assert_eq!(event.user_uid, "user-42");

        // And it round-trips back out under the wire name.
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["user_id"], "user-42");
        assert!(json.get("user_uid").is_none());
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = decode_event(b"not json at all").unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        // Drop activity_uuid from an otherwise valid document.
        let payload = sample_event_json("a1", "u1");
        let mut value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        value.as_object_mut().unwrap().remove("activity_uuid");
        let payload = serde_json::to_vec(&value).unwrap();

        let err = decode_event(&payload).unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let payload = sample_event_json("a1", "u1");
        let mut value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        value["mouse_clicks"] = serde_json::json!("twelve");
        let payload = serde_json::to_vec(&value).unwrap();

        let err = decode_event(&payload).unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
    }
}
