//! Outbound events broadcast to every connection.
//!
//! A [`RelayEvent`] serializes directly to the wire frame
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

use super::{PositionRecord, VisitorId};

/// Event emitted after every accepted state change, and once per record
/// in the snapshot a new connection receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RelayEvent {
    /// Full latest record for one visitor.
    Position(PositionRecord),
    /// The visitor's record was removed.
    DisconnectUser(VisitorId),
}

impl RelayEvent {
    /// Returns the visitor this event is about.
    #[must_use]
    pub fn visitor_id(&self) -> &VisitorId {
        match self {
            Self::Position(record) => &record.id,
            Self::DisconnectUser(id) => id,
        }
    }

    /// Returns the wire event name.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Position(_) => "position",
            Self::DisconnectUser(_) => "disconnectUser",
        }
    }
}
