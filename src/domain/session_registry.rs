//! In-memory session state: bindings and position records.
//!
//! [`SessionRegistry`] holds two maps: connection → visitor (who may
//! update what) and visitor → latest [`PositionRecord`]. It has no
//! interior locking. It is owned by the single relay worker (see
//! [`crate::service::spawn_relay`]), which serializes every mutation.

use std::collections::HashMap;

use super::{ConnectionId, PositionRecord, VisitorId};

/// Process-lifetime session store.
///
/// # Invariants
///
/// - At most one record per visitor; [`upsert`](Self::upsert) replaces.
/// - At most one binding per connection; [`bind`](Self::bind) overwrites.
/// - Bindings and records are independent: removing one never touches
///   the other.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    positions: HashMap<VisitorId, PositionRecord>,
    bindings: HashMap<ConnectionId, VisitorId>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored record, in no particular order.
    #[must_use]
    pub fn snapshot_all(&self) -> Vec<PositionRecord> {
        self.positions.values().cloned().collect()
    }

    /// Stores `record` under `id`, replacing any previous record.
    pub fn upsert(&mut self, id: VisitorId, record: PositionRecord) {
        self.positions.insert(id, record);
    }

    /// Deletes the record for `id`, returning it if it existed.
    pub fn remove(&mut self, id: &VisitorId) -> Option<PositionRecord> {
        self.positions.remove(id)
    }

    /// Returns the record for `id`.
    #[must_use]
    pub fn get(&self, id: &VisitorId) -> Option<&PositionRecord> {
        self.positions.get(id)
    }

    /// Returns a mutable reference to the record for `id`.
    pub fn get_mut(&mut self, id: &VisitorId) -> Option<&mut PositionRecord> {
        self.positions.get_mut(id)
    }

    /// Binds `connection` to `visitor`, overwriting any previous binding.
    /// The previously bound visitor's record is left in place.
    pub fn bind(&mut self, connection: ConnectionId, visitor: VisitorId) {
        self.bindings.insert(connection, visitor);
    }

    /// Returns the visitor `connection` is bound to.
    #[must_use]
    pub fn binding_of(&self, connection: ConnectionId) -> Option<&VisitorId> {
        self.bindings.get(&connection)
    }

    /// Removes the binding for `connection`, returning the visitor it held.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<VisitorId> {
        self.bindings.remove(&connection)
    }

    /// Number of stored position records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if no position records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of connections currently bound to a visitor.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}
