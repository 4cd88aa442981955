//! Domain layer: identifiers, position records, session registry, and
//! the event bus.
//!
//! Everything here is synchronous and transport-agnostic. The
//! [`SessionRegistry`] is a plain owned value; serialization of access
//! is the job of the relay worker in [`crate::service`].

pub mod connection_id;
pub mod event_bus;
pub mod position_record;
pub mod relay_event;
pub mod session_registry;
pub mod visitor_id;

pub use connection_id::ConnectionId;
pub use event_bus::EventBus;
pub use position_record::{PositionRecord, PositionUpdate};
pub use relay_event::RelayEvent;
pub use session_registry::SessionRegistry;
pub use visitor_id::VisitorId;
