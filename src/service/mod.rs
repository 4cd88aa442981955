//! Service layer: the relay state machine and the worker that owns it.
//!
//! [`Relay`] applies connection events to the session registry and
//! emits broadcasts through the [`super::domain::EventBus`].
//! [`spawn_relay`] runs it behind a single-dispatch queue.

pub mod relay;
pub mod worker;

pub use relay::{Inbound, Outcome, Relay, Subscription};
pub use worker::{RelayCommand, RelayHandle, spawn_relay};
