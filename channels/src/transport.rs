//! Seam between channels and the socket implementation.
//!
//! A channel asks its [`Connector`] for a [`Socket`] and hands it an
//! [`EventSink`]. The socket reports everything that happens to it through
//! that sink, tagged with the [`ConnectionId`] it was created for, and the
//! channel applies those events in arrival order.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Identifies one socket within the lifetime of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened to a socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    /// One binary websocket message.
    Message(Bytes),
    Closed,
    /// Transport failure, described for diagnostics only.
    Errored(String),
}

/// Where a socket reports its events.
#[derive(Clone, Debug)]
pub struct EventSink {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<(ConnectionId, SocketEvent)>,
}

impl EventSink {
    pub(crate) fn new(
        id: ConnectionId,
        tx: mpsc::UnboundedSender<(ConnectionId, SocketEvent)>,
    ) -> Self {
        Self { id, tx }
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue `event` for the owning channel. Events emitted after the channel
    /// is dropped are discarded.
    pub fn emit(&self, event: SocketEvent) {
        if self.tx.send((self.id, event)).is_err() {
            tracing::trace!(connection = %self.id, "event sink closed; channel dropped");
        }
    }
}

/// Opens sockets for a channel.
pub trait Connector {
    type Socket: Socket;

    /// Start connecting to `url`. Must return immediately; the outcome is
    /// reported later through `events`.
    fn connect(&mut self, url: &str, events: EventSink) -> Self::Socket;
}

/// Write half of a live socket.
pub trait Socket {
    /// Transmit one binary message. Never blocks; completion is not observed.
    fn send(&mut self, payload: Bytes);

    /// Begin closing. The socket reports [`SocketEvent::Closed`] when done.
    fn close(&mut self);
}
