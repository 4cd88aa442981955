//! WebSocket wire format: named events in a JSON envelope.
//!
//! Every frame is `{"event": "<name>", "data": <payload>}`. Inbound
//! frames decode into [`ClientMessage`] and are validated into a typed
//! [`Inbound`]; outbound frames are serialized
//! [`crate::domain::RelayEvent`]s.

use serde::Deserialize;

use crate::domain::{PositionUpdate, RelayEvent, VisitorId};
use crate::error::RelayError;
use crate::service::Inbound;

/// Raw inbound event, before required fields are checked.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// `register` — claim a visitor identifier.
    Register(RegisterPayload),
    /// `position` — push a location.
    Position(PositionPayload),
    /// `stopTracking` — remove a visitor's record.
    StopTracking(StopTrackingPayload),
}

/// Payload of `register`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    /// Visitor identifier (required).
    #[serde(default)]
    pub id: Option<String>,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Payload of `position`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPayload {
    /// Visitor identifier (required).
    #[serde(default)]
    pub id: Option<String>,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Latitude.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude.
    #[serde(default)]
    pub lng: Option<f64>,
    /// Accuracy.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Client timestamp in epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Payload of `stopTracking`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopTrackingPayload {
    /// Visitor identifier (required).
    #[serde(default)]
    pub id: Option<String>,
}

impl ClientMessage {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Decode`] for invalid JSON, unknown event
    /// names, or a payload of the wrong shape.
    pub fn decode(text: &str) -> Result<Self, RelayError> {
        serde_json::from_str(text).map_err(RelayError::Decode)
    }

    /// Returns the wire event name.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::Position(_) => "position",
            Self::StopTracking(_) => "stopTracking",
        }
    }

    /// Checks required fields and converts into an [`Inbound`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingId`] if `id` is absent or empty.
    pub fn validate(self) -> Result<Inbound, RelayError> {
        let event = self.event_name();
        match self {
            Self::Register(p) => Ok(Inbound::Register {
                id: VisitorId::parse(p.id, event)?,
                display_name: p.display_name,
            }),
            Self::Position(p) => Ok(Inbound::Position(PositionUpdate {
                id: VisitorId::parse(p.id, event)?,
                display_name: p.display_name,
                lat: p.lat,
                lng: p.lng,
                accuracy: p.accuracy,
                timestamp: p.timestamp,
            })),
            Self::StopTracking(p) => Ok(Inbound::StopTracking {
                id: VisitorId::parse(p.id, event)?,
            }),
        }
    }
}

/// Decodes and validates a text frame in one step.
///
/// # Errors
///
/// Returns [`RelayError::Decode`] or [`RelayError::MissingId`].
pub fn parse_frame(text: &str) -> Result<Inbound, RelayError> {
    ClientMessage::decode(text)?.validate()
}

/// Serializes an outbound event into a text frame.
///
/// # Errors
///
/// Returns [`RelayError::Encode`] if serialization fails.
pub fn encode_event(event: &RelayEvent) -> Result<String, RelayError> {
    serde_json::to_string(event).map_err(RelayError::Encode)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn position_frame_validates() {
        let frame = r#"{"event":"position","data":{"id":"v1","lat":10,"lng":20,"accuracy":5}}"#;
        let Ok(Inbound::Position(update)) = parse_frame(frame) else {
            panic!("expected position");
        };
        assert_eq!(update.id.as_str(), "v1");
        assert_eq!(update.lat, Some(10.0));
        assert_eq!(update.timestamp, None);
    }

    #[test]
    fn fractional_and_exponent_timestamps_decode() {
        for (raw, expected) in [("1.7e12", 1.7e12), ("1700000000000.5", 1_700_000_000_000.5)] {
            let frame = format!(
                r#"{{"event":"position","data":{{"id":"v1","lat":1,"lng":2,"accuracy":5,"timestamp":{raw}}}}}"#
            );
            let Ok(Inbound::Position(update)) = parse_frame(&frame) else {
                panic!("timestamp {raw} should decode");
            };
            assert_eq!(update.timestamp, Some(expected));
        }
    }

    #[test]
    fn register_with_display_name() {
        let frame = r#"{"event":"register","data":{"id":"v1","displayName":"Alice"}}"#;
        let Ok(inbound) = parse_frame(frame) else {
            panic!("expected register");
        };
        assert_eq!(
            inbound,
            Inbound::Register {
                id: VisitorId::from("v1"),
                display_name: Some("Alice".to_string()),
            }
        );
    }

    #[test]
    fn missing_or_empty_id_is_rejected() {
        for frame in [
            r#"{"event":"register","data":{}}"#,
            r#"{"event":"position","data":{"id":"","lat":1}}"#,
            r#"{"event":"stopTracking","data":{"id":null}}"#,
        ] {
            assert!(
                matches!(parse_frame(frame), Err(RelayError::MissingId { .. })),
                "frame should be rejected: {frame}"
            );
        }
    }

    #[test]
    fn garbage_and_unknown_events_fail_decoding() {
        for frame in [
            "not json",
            r#"{"event":"teleport","data":{"id":"v1"}}"#,
            r#"{"event":"position","data":null}"#,
            r#"{"event":"position","data":{"id":"v1","lat":"north"}}"#,
        ] {
            assert!(
                matches!(parse_frame(frame), Err(RelayError::Decode(_))),
                "frame should not decode: {frame}"
            );
        }
    }

    #[test]
    fn encoded_disconnect_matches_wire_shape() {
        let Ok(text) = encode_event(&RelayEvent::DisconnectUser(VisitorId::from("v1"))) else {
            panic!("encode failed");
        };
        assert_eq!(text, r#"{"event":"disconnectUser","data":"v1"}"#);
    }
}
