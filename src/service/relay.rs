//! Relay state machine: applies connection events to the registry and
//! publishes the resulting broadcasts.

use tokio::sync::broadcast;

use crate::domain::position_record::now_millis;
use crate::domain::{
    ConnectionId, EventBus, PositionRecord, PositionUpdate, RelayEvent, SessionRegistry, VisitorId,
};

/// A validated inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Bind the connection, optionally patching the display name.
    Register {
        /// Visitor to bind to.
        id: VisitorId,
        /// New display name for an existing record.
        display_name: Option<String>,
    },
    /// Push a position for the bound (or first-claimed) visitor.
    Position(PositionUpdate),
    /// Remove a visitor's record.
    StopTracking {
        /// Visitor whose record is removed.
        id: VisitorId,
    },
}

impl Inbound {
    /// Returns the wire event name this message arrived as.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Position(_) => "position",
            Self::StopTracking { .. } => "stopTracking",
        }
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// State changed and this event went to every connection.
    Broadcast(RelayEvent),
    /// The connection is bound to a different visitor; nothing changed.
    Unauthorized {
        /// Visitor the connection is actually bound to.
        bound: VisitorId,
    },
    /// Nothing to broadcast (no record to patch or remove).
    Unchanged,
}

/// What a new connection starts from: the records present at connect
/// time, and a receiver for everything broadcast afterwards.
#[derive(Debug)]
pub struct Subscription {
    /// One record per visitor present at connect time.
    pub snapshot: Vec<PositionRecord>,
    /// Broadcasts published after the snapshot was taken.
    pub events: broadcast::Receiver<RelayEvent>,
}

/// Owner of the session state.
///
/// All methods are synchronous and take `&mut self`, so whoever owns the
/// `Relay` serializes every read-modify-broadcast sequence. In the server
/// that owner is the worker started by [`super::spawn_relay`].
#[derive(Debug)]
pub struct Relay {
    registry: SessionRegistry,
    event_bus: EventBus,
}

impl Relay {
    /// Creates a relay with an empty registry publishing on `event_bus`.
    #[must_use]
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            registry: SessionRegistry::new(),
            event_bus,
        }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Returns the event bus broadcasts are published on.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribes a new connection and snapshots current records in one
    /// step, so nothing is missed or delivered twice. Creates no binding.
    #[must_use]
    pub fn connect(&self, connection: ConnectionId) -> Subscription {
        let sub = self.subscribe();
        tracing::info!(
            %connection,
            records = sub.snapshot.len(),
            receivers = self.event_bus.receiver_count(),
            "connected"
        );
        sub
    }

    /// Replaces the subscription of a connection whose receiver fell
    /// behind the bus. Same atomicity as [`connect`](Self::connect).
    #[must_use]
    pub fn resync(&self, connection: ConnectionId) -> Subscription {
        let sub = self.subscribe();
        tracing::info!(%connection, records = sub.snapshot.len(), "resynced");
        sub
    }

    fn subscribe(&self) -> Subscription {
        Subscription {
            events: self.event_bus.subscribe(),
            snapshot: self.registry.snapshot_all(),
        }
    }

    /// Applies a validated inbound message from `connection`.
    pub fn handle(&mut self, connection: ConnectionId, inbound: Inbound) -> Outcome {
        match inbound {
            Inbound::Register { id, display_name } => self.register(connection, id, display_name),
            Inbound::Position(update) => self.position(connection, update),
            Inbound::StopTracking { id } => self.stop_tracking(&id),
        }
    }

    /// Binds `connection` to `id`. If a record for `id` exists and a
    /// non-empty `display_name` is given, patches only that field and
    /// broadcasts the record.
    pub fn register(
        &mut self,
        connection: ConnectionId,
        id: VisitorId,
        display_name: Option<String>,
    ) -> Outcome {
        tracing::info!(%connection, visitor = %id, "registered");
        self.registry.bind(connection, id.clone());

        let Some(name) = display_name.filter(|name| !name.is_empty()) else {
            return Outcome::Unchanged;
        };
        let Some(record) = self.registry.get_mut(&id) else {
            return Outcome::Unchanged;
        };
        record.display_name = name;
        let event = RelayEvent::Position(record.clone());
        self.publish(event)
    }

    /// Stores a position update and broadcasts it.
    ///
    /// An unbound connection is bound to the update's visitor first. A
    /// connection bound to another visitor is rejected with no change.
    pub fn position(&mut self, connection: ConnectionId, update: PositionUpdate) -> Outcome {
        match self.registry.binding_of(connection) {
            Some(bound) if *bound != update.id => {
                tracing::debug!(%connection, %bound, claimed = %update.id, "position rejected");
                return Outcome::Unauthorized {
                    bound: bound.clone(),
                };
            }
            Some(_) => {}
            None => self.registry.bind(connection, update.id.clone()),
        }

        let record = update.into_record(now_millis());
        self.registry.upsert(record.id.clone(), record.clone());
        self.publish(RelayEvent::Position(record))
    }

    /// Removes the record for `id` and broadcasts `disconnectUser`.
    ///
    /// Any connection may stop tracking any visitor; bindings are not
    /// touched.
    pub fn stop_tracking(&mut self, id: &VisitorId) -> Outcome {
        if self.registry.remove(id).is_none() {
            return Outcome::Unchanged;
        }
        tracing::info!(visitor = %id, "tracking stopped");
        self.publish(RelayEvent::DisconnectUser(id.clone()))
    }

    /// Drops the binding for `connection`, removing and announcing the
    /// bound visitor's record if one exists.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Outcome {
        let bound = self.registry.unbind(connection);
        tracing::info!(%connection, visitor = ?bound.as_ref().map(VisitorId::as_str), "disconnected");

        let Some(id) = bound else {
            return Outcome::Unchanged;
        };
        if self.registry.remove(&id).is_none() {
            return Outcome::Unchanged;
        }
        self.publish(RelayEvent::DisconnectUser(id))
    }

    fn publish(&self, event: RelayEvent) -> Outcome {
        let receivers = self.event_bus.publish(event.clone());
        tracing::debug!(
            event = event.event_name(),
            visitor = %event.visitor_id(),
            receivers,
            "broadcast"
        );
        Outcome::Broadcast(event)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn relay() -> Relay {
        Relay::new(EventBus::new(64))
    }

    fn update(id: &str, lat: f64, lng: f64) -> PositionUpdate {
        PositionUpdate {
            id: VisitorId::from(id),
            display_name: None,
            lat: Some(lat),
            lng: Some(lng),
            accuracy: Some(5.0),
            timestamp: None,
        }
    }

    fn stored(relay: &Relay, id: &str) -> PositionRecord {
        let Some(record) = relay.registry().get(&VisitorId::from(id)) else {
            panic!("no record for {id}");
        };
        record.clone()
    }

    #[test]
    fn latest_update_replaces_record() {
        let mut relay = relay();
        let conn = ConnectionId::new();
        relay.position(conn, update("v1", 1.0, 1.0));
        relay.position(conn, update("v1", 2.0, 3.0));

        assert_eq!(relay.registry().len(), 1);
        let record = stored(&relay, "v1");
        assert_eq!((record.lat, record.lng), (Some(2.0), Some(3.0)));
    }

    #[test]
    fn default_fill_on_first_position() {
        let mut relay = relay();
        let before = now_millis();
        let outcome = relay.position(ConnectionId::new(), update("v1", 10.0, 20.0));

        let Outcome::Broadcast(RelayEvent::Position(record)) = outcome else {
            panic!("expected position broadcast, got {outcome:?}");
        };
        assert_eq!(record.display_name, "v1");
        assert!(record.timestamp >= before);
        assert_eq!(record.accuracy, Some(5.0));
    }

    #[test]
    fn fractional_client_timestamp_is_kept() {
        let mut relay = relay();
        let mut fractional = update("v1", 1.0, 2.0);
        fractional.timestamp = Some(1_700_000_000_000.5);

        let outcome = relay.position(ConnectionId::new(), fractional);

        let Outcome::Broadcast(RelayEvent::Position(record)) = outcome else {
            panic!("expected position broadcast, got {outcome:?}");
        };
        assert_eq!(record.timestamp, 1_700_000_000_000.5);
        assert_eq!(stored(&relay, "v1").timestamp, 1_700_000_000_000.5);
    }

    #[test]
    fn first_position_claims_binding() {
        let mut relay = relay();
        let conn = ConnectionId::new();
        relay.position(conn, update("v1", 0.0, 0.0));
        assert_eq!(relay.registry().binding_of(conn), Some(&VisitorId::from("v1")));
    }

    #[test]
    fn bound_connection_cannot_push_other_visitor() {
        let mut relay = relay();
        let owner = ConnectionId::new();
        let intruder = ConnectionId::new();
        relay.position(owner, update("w", 5.0, 5.0));
        relay.register(intruder, VisitorId::from("v"), None);

        let outcome = relay.position(intruder, update("w", 9.0, 9.0));

        assert_eq!(
            outcome,
            Outcome::Unauthorized {
                bound: VisitorId::from("v")
            }
        );
        assert_eq!(stored(&relay, "w").lat, Some(5.0));
        assert_eq!(relay.registry().binding_of(intruder), Some(&VisitorId::from("v")));
    }

    #[test]
    fn register_patches_only_display_name() {
        let mut relay = relay();
        let conn = ConnectionId::new();
        relay.position(conn, update("v1", 1.0, 2.0));
        let original = stored(&relay, "v1");

        let outcome = relay.register(conn, VisitorId::from("v1"), Some("Alice".to_string()));

        let Outcome::Broadcast(RelayEvent::Position(record)) = outcome else {
            panic!("expected position broadcast, got {outcome:?}");
        };
        assert_eq!(record.display_name, "Alice");
        assert_eq!((record.lat, record.lng), (Some(1.0), Some(2.0)));
        assert_eq!(record.timestamp, original.timestamp);
    }

    #[test]
    fn register_without_record_only_binds() {
        let mut relay = relay();
        let conn = ConnectionId::new();
        let outcome = relay.register(conn, VisitorId::from("v1"), Some("Alice".to_string()));

        assert_eq!(outcome, Outcome::Unchanged);
        assert!(relay.registry().is_empty());
        assert_eq!(relay.registry().binding_of(conn), Some(&VisitorId::from("v1")));
    }

    #[test]
    fn re_register_keeps_previous_record() {
        let mut relay = relay();
        let conn = ConnectionId::new();
        relay.position(conn, update("a", 1.0, 1.0));
        relay.register(conn, VisitorId::from("b"), None);

        assert!(relay.registry().get(&VisitorId::from("a")).is_some());
        assert_eq!(relay.registry().binding_of(conn), Some(&VisitorId::from("b")));
    }

    #[test]
    fn stop_tracking_is_idempotent_for_unknown_visitor() {
        let mut relay = relay();
        let mut rx = relay.event_bus().subscribe();
        let ghost = VisitorId::from("ghost");

        assert_eq!(relay.stop_tracking(&ghost), Outcome::Unchanged);
        assert_eq!(relay.stop_tracking(&ghost), Outcome::Unchanged);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stop_tracking_needs_no_ownership_and_keeps_binding() {
        let mut relay = relay();
        let owner = ConnectionId::new();
        let other = ConnectionId::new();
        relay.position(owner, update("v1", 1.0, 1.0));

        let outcome = relay.handle(
            other,
            Inbound::StopTracking {
                id: VisitorId::from("v1"),
            },
        );

        assert_eq!(
            outcome,
            Outcome::Broadcast(RelayEvent::DisconnectUser(VisitorId::from("v1")))
        );
        assert!(relay.registry().is_empty());
        assert_eq!(relay.registry().binding_of(owner), Some(&VisitorId::from("v1")));
    }

    #[test]
    fn disconnect_removes_bound_record_once() {
        let mut relay = relay();
        let mut rx = relay.event_bus().subscribe();
        let conn = ConnectionId::new();
        relay.position(conn, update("v1", 1.0, 1.0));

        let outcome = relay.disconnect(conn);

        assert_eq!(
            outcome,
            Outcome::Broadcast(RelayEvent::DisconnectUser(VisitorId::from("v1")))
        );
        assert!(relay.registry().is_empty());
        assert_eq!(relay.registry().binding_count(), 0);

        let Ok(RelayEvent::Position(_)) = rx.try_recv() else {
            panic!("expected the position broadcast first");
        };
        let Ok(RelayEvent::DisconnectUser(id)) = rx.try_recv() else {
            panic!("expected one disconnectUser");
        };
        assert_eq!(id.as_str(), "v1");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_without_record_emits_nothing() {
        let mut relay = relay();
        let mut rx = relay.event_bus().subscribe();
        let conn = ConnectionId::new();
        relay.register(conn, VisitorId::from("v1"), None);

        assert_eq!(relay.disconnect(conn), Outcome::Unchanged);
        assert_eq!(relay.registry().binding_count(), 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(relay.disconnect(ConnectionId::new()), Outcome::Unchanged);
    }

    #[test]
    fn resync_after_lag_reflects_final_state() {
        let mut relay = Relay::new(EventBus::new(2));
        let conn = ConnectionId::new();
        let mut slow = relay.connect(ConnectionId::new());

        for lat in [1.0, 2.0, 3.0] {
            relay.position(conn, update("v1", lat, 0.0));
        }
        relay.position(ConnectionId::new(), update("gone", 0.0, 0.0));
        relay.stop_tracking(&VisitorId::from("gone"));

        assert!(matches!(
            slow.events.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));

        slow = relay.resync(ConnectionId::new());
        assert_eq!(slow.snapshot.len(), 1);
        let Some(record) = slow.snapshot.first() else {
            panic!("empty snapshot");
        };
        assert_eq!(record.lat, Some(3.0));
        assert!(slow.events.try_recv().is_err());
    }

    #[test]
    fn snapshot_then_live_events() {
        let mut relay = relay();
        relay.position(ConnectionId::new(), update("a", 1.0, 1.0));
        relay.position(ConnectionId::new(), update("b", 2.0, 2.0));

        let Subscription {
            snapshot,
            mut events,
        } = relay.connect(ConnectionId::new());
        assert_eq!(snapshot.len(), 2);
        assert!(events.try_recv().is_err());

        relay.position(ConnectionId::new(), update("c", 3.0, 3.0));
        let Ok(event) = events.try_recv() else {
            panic!("expected live event");
        };
        assert_eq!(event.visitor_id().as_str(), "c");
    }
}
