//! Single-dispatch relay worker.
//!
//! One tokio task owns the [`Relay`] and drains a bounded queue of
//! [`RelayCommand`]s in arrival order. Connections talk to it through a
//! cloneable [`RelayHandle`], so no handler ever observes a partially
//! applied update.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::relay::{Inbound, Outcome, Relay, Subscription};
use crate::domain::ConnectionId;
use crate::error::RelayError;

/// Command queued for the relay worker.
#[derive(Debug)]
pub enum RelayCommand {
    /// A socket was accepted; reply with its snapshot and receiver.
    Connect {
        /// New connection.
        connection: ConnectionId,
        /// Where to deliver the subscription.
        reply: oneshot::Sender<Subscription>,
    },
    /// A connection's receiver lagged; reply with a fresh subscription.
    Resync {
        /// Lagging connection.
        connection: ConnectionId,
        /// Where to deliver the new subscription.
        reply: oneshot::Sender<Subscription>,
    },
    /// A validated inbound message arrived.
    Inbound {
        /// Sending connection.
        connection: ConnectionId,
        /// The message.
        message: Inbound,
    },
    /// A socket closed.
    Disconnect {
        /// Closed connection.
        connection: ConnectionId,
    },
}

/// Cloneable sender side of the relay worker.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    commands: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Registers a new connection and returns its starting state.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::WorkerGone`] if the worker has stopped.
    pub async fn connect(&self, connection: ConnectionId) -> Result<Subscription, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Connect { connection, reply }).await?;
        rx.await.map_err(|_| RelayError::WorkerGone)
    }

    /// Takes a new snapshot and receiver for a connection that fell
    /// behind the event bus.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::WorkerGone`] if the worker has stopped.
    pub async fn resync(&self, connection: ConnectionId) -> Result<Subscription, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Resync { connection, reply }).await?;
        rx.await.map_err(|_| RelayError::WorkerGone)
    }

    /// Queues a validated inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::WorkerGone`] if the worker has stopped.
    pub async fn submit(&self, connection: ConnectionId, message: Inbound) -> Result<(), RelayError> {
        self.send(RelayCommand::Inbound {
            connection,
            message,
        })
        .await
    }

    /// Queues the close of a connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::WorkerGone`] if the worker has stopped.
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), RelayError> {
        self.send(RelayCommand::Disconnect { connection }).await
    }

    async fn send(&self, command: RelayCommand) -> Result<(), RelayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RelayError::WorkerGone)
    }
}

/// Starts the worker task owning `relay`.
///
/// The task exits once every [`RelayHandle`] is dropped and hands the
/// relay back through the returned [`JoinHandle`].
#[must_use]
pub fn spawn_relay(relay: Relay, queue_capacity: usize) -> (RelayHandle, JoinHandle<Relay>) {
    let (commands, rx) = mpsc::channel(queue_capacity.max(1));
    let task = tokio::spawn(run_worker(relay, rx));
    (RelayHandle { commands }, task)
}

async fn run_worker(mut relay: Relay, mut rx: mpsc::Receiver<RelayCommand>) -> Relay {
    while let Some(command) = rx.recv().await {
        match command {
            RelayCommand::Connect { connection, reply } => {
                if reply.send(relay.connect(connection)).is_err() {
                    tracing::debug!(%connection, "connection went away before subscribing");
                }
            }
            RelayCommand::Resync { connection, reply } => {
                if reply.send(relay.resync(connection)).is_err() {
                    tracing::debug!(%connection, "connection went away before resync");
                }
            }
            RelayCommand::Inbound {
                connection,
                message,
            } => {
                let event = message.event_name();
                log_outcome(connection, event, &relay.handle(connection, message));
            }
            RelayCommand::Disconnect { connection } => {
                log_outcome(connection, "disconnect", &relay.disconnect(connection));
            }
        }
    }
    tracing::debug!("relay worker stopped");
    relay
}

fn log_outcome(connection: ConnectionId, event: &'static str, outcome: &Outcome) {
    match outcome {
        Outcome::Broadcast(_) => {}
        Outcome::Unauthorized { bound } => {
            tracing::debug!(%connection, event, %bound, "not authorized for visitor");
        }
        Outcome::Unchanged => tracing::debug!(%connection, event, "no change"),
    }
}
