//! Latest known location of one visitor.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::VisitorId;

/// Position record stored per visitor and broadcast as the `position`
/// event payload.
///
/// Coordinates and accuracy are carried verbatim from the client with no
/// range checks. A field the client omitted stays absent on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    /// Visitor the record belongs to.
    pub id: VisitorId,
    /// Human-readable label; the identifier itself unless supplied.
    pub display_name: String,
    /// Latitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Client-defined accuracy (e.g. GPS radius in meters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Milliseconds since the Unix epoch, as sent by the client.
    pub timestamp: f64,
}

/// A validated `position` update, before defaults are filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    /// Visitor the update claims to be for.
    pub id: VisitorId,
    /// Optional label; empty strings are treated as absent.
    pub display_name: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// Accuracy.
    pub accuracy: Option<f64>,
    /// Client timestamp in epoch milliseconds; `0` is treated as absent.
    pub timestamp: Option<f64>,
}

impl PositionUpdate {
    /// Builds the full record, defaulting `display_name` to the visitor id
    /// and `timestamp` to `now_ms`.
    #[must_use]
    pub fn into_record(self, now_ms: f64) -> PositionRecord {
        let display_name = self
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.id.as_str().to_string());
        let timestamp = self.timestamp.filter(|ts| *ts != 0.0).unwrap_or(now_ms);
        PositionRecord {
            id: self.id,
            display_name,
            lat: self.lat,
            lng: self.lng,
            accuracy: self.accuracy,
            timestamp,
        }
    }
}

/// Current server wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> f64 {
    Utc::now().timestamp_millis() as f64
}
