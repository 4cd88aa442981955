//! What one client's map currently shows.
//!
//! Tracks the visitors a connection has been sent a `position` for and
//! not yet a `disconnectUser`. After the connection's bus receiver lags,
//! [`ClientView::resync`] turns a fresh snapshot into the frames that
//! bring the client's map back in line with the registry.

use std::collections::HashSet;

use crate::domain::{PositionRecord, RelayEvent, VisitorId};

/// Visitors currently shown on one client's map.
#[derive(Debug, Default)]
pub struct ClientView {
    shown: HashSet<VisitorId>,
}

impl ClientView {
    /// Creates an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `event` was sent to the client.
    pub fn observe(&mut self, event: &RelayEvent) {
        match event {
            RelayEvent::Position(record) => {
                self.shown.insert(record.id.clone());
            }
            RelayEvent::DisconnectUser(id) => {
                self.shown.remove(id);
            }
        }
    }

    /// Builds the frames for a resync: `disconnectUser` for every shown
    /// visitor missing from `snapshot`, then one `position` per record.
    /// The view is updated as if all of them were sent.
    pub fn resync(&mut self, snapshot: Vec<PositionRecord>) -> Vec<RelayEvent> {
        let live: HashSet<&VisitorId> = snapshot.iter().map(|r| &r.id).collect();
        let mut frames: Vec<RelayEvent> = self
            .shown
            .iter()
            .filter(|id| !live.contains(id))
            .cloned()
            .map(RelayEvent::DisconnectUser)
            .collect();
        frames.extend(snapshot.into_iter().map(RelayEvent::Position));

        for frame in &frames {
            self.observe(frame);
        }
        frames
    }

    /// Number of visitors shown.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shown.len()
    }

    /// Returns `true` if nothing is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}
