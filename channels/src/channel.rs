//! Lazily connecting, auto-encoding websocket channel.
//!
//! ARCHITECTURE
//! ============
//! One generic [`Channel`] holds the state shared by both conversation
//! shapes: the endpoint, the two codecs, at most one connection, a FIFO of
//! payloads waiting for that connection to open, and the caller's callbacks.
//! The [`Policy`] parameter only selects which operations exist
//! (`send` for [`RequestResponse`], `start`/`stop`/`toggle` for
//! [`Subscription`]); see `rpc.rs` and `stream.rs`.
//!
//! LIFECYCLE
//! =========
//! `Absent -> Connecting -> Open -> (Closing) -> Absent`. A connection is
//! created on demand by the first outbound action and cleared by the close or
//! error event of that same socket. Events from any other socket are stale
//! and ignored, so a reconnect never reuses or is disturbed by an old socket.
//!
//! Socket events are applied by [`Channel::next_event`] (async) or
//! [`Channel::dispatch_pending`] (non-blocking). Callbacks run inside those
//! calls, in event order.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use protos::{CodecError, ProtoCodec, ProtoRegistry};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_PENDING;
use crate::error::{ChannelError, ConnectionError};
use crate::framer;
use crate::transport::{ConnectionId, Connector, EventSink, Socket, SocketEvent};

/// Conversation shape of a [`Channel`].
pub trait Policy {
    /// Short label used in logs.
    const KIND: &'static str;
}

/// One request in, one response out, per `send`.
#[derive(Debug)]
pub enum RequestResponse {}

/// Explicitly started server push.
#[derive(Debug)]
pub enum Subscription {}

impl Policy for RequestResponse {
    const KIND: &'static str = "rpc";
}

impl Policy for Subscription {
    const KIND: &'static str = "stream";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Absent,
    Connecting,
    Open,
    /// `close()` was requested; waiting for the socket to report it.
    Closing,
}

/// What [`Channel::next_event`] applied.
#[derive(Debug)]
pub enum ChannelEvent {
    Opened,
    Received(Value),
    /// A message arrived but did not decode; it was dropped.
    Undecodable(CodecError),
    Closed,
    Errored(ConnectionError),
}

type ReceiveHandler = Box<dyn FnMut(&Value) + Send>;
type ErrorHandler = Box<dyn FnMut(&ConnectionError) + Send>;
type LifecycleHandler = Box<dyn FnMut() + Send>;

#[derive(Default)]
pub(crate) struct Handlers {
    pub(crate) receive: Option<ReceiveHandler>,
    pub(crate) error: Option<ErrorHandler>,
    pub(crate) open: Option<LifecycleHandler>,
    pub(crate) close: Option<LifecycleHandler>,
}

pub(crate) struct Connection<S> {
    pub(crate) id: ConnectionId,
    pub(crate) socket: S,
    pub(crate) state: ConnectionState,
}

/// A conversation bound to one endpoint and one request/response schema pair.
pub struct Channel<P: Policy, C: Connector> {
    url: String,
    pub(crate) request_codec: Arc<dyn ProtoCodec>,
    response_codec: Arc<dyn ProtoCodec>,
    connector: C,
    pub(crate) connection: Option<Connection<C::Socket>>,
    pub(crate) pending: VecDeque<Bytes>,
    max_pending: usize,
    next_connection: u64,
    events_tx: mpsc::UnboundedSender<(ConnectionId, SocketEvent)>,
    events_rx: mpsc::UnboundedReceiver<(ConnectionId, SocketEvent)>,
    pub(crate) handlers: Handlers,
    _policy: PhantomData<P>,
}

impl<P: Policy, C: Connector> Channel<P, C> {
    /// Bind a channel to `url`, resolving both codecs now.
    ///
    /// No connection is made until the first outbound action.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::MissingCodec`] if either type name is not in
    /// `registry`.
    pub fn new(
        url: impl Into<String>,
        request_type: &str,
        response_type: &str,
        registry: &ProtoRegistry,
        connector: C,
    ) -> Result<Self, ChannelError> {
        let request_codec = registry.resolve(request_type)?;
        let response_codec = registry.resolve(response_type)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            url: url.into(),
            request_codec,
            response_codec,
            connector,
            connection: None,
            pending: VecDeque::new(),
            max_pending: DEFAULT_MAX_PENDING,
            next_connection: 0,
            events_tx,
            events_rx,
            handlers: Handlers::default(),
            _policy: PhantomData,
        })
    }

    /// Limit how many payloads may wait for a connection to open.
    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    /// Endpoint this channel connects to. Diagnostics only.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map_or(ConnectionState::Absent, |c| c.state)
    }

    /// True from the moment a connection is requested until its close or
    /// error event is applied.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(|c| c.id)
    }

    /// Payloads waiting for the connection to open.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Called with each decoded response. Without it, responses are dropped.
    pub fn on_receive(&mut self, handler: impl FnMut(&Value) + Send + 'static) {
        self.handlers.receive = Some(Box::new(handler));
    }

    /// Called when the connection fails. Without it, failures are only logged.
    pub fn on_error(&mut self, handler: impl FnMut(&ConnectionError) + Send + 'static) {
        self.handlers.error = Some(Box::new(handler));
    }

    /// Wait for the next socket event and apply it.
    ///
    /// Stale events are skipped. Returns `None` at once when there is no
    /// connection, since nothing can arrive until the next `send`/`start`.
    /// With a connection this waits as long as the socket stays silent, so
    /// callers expecting a reply should bound it with `tokio::time::timeout`.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            if self.connection.is_none() {
                return None;
            }
            let (id, event) = self.events_rx.recv().await?;
            if let Some(applied) = self.handle_event(id, event) {
                return Some(applied);
            }
        }
    }

    /// Apply every socket event already queued, without waiting.
    pub fn dispatch_pending(&mut self) -> Vec<ChannelEvent> {
        let mut applied = Vec::new();
        while let Ok((id, event)) = self.events_rx.try_recv() {
            applied.extend(self.handle_event(id, event));
        }
        applied
    }

    /// Apply one socket event. Returns `None` when the event belongs to a
    /// socket other than the live one.
    pub fn handle_event(&mut self, id: ConnectionId, event: SocketEvent) -> Option<ChannelEvent> {
        let Some(connection) = self.connection.as_mut().filter(|c| c.id == id) else {
            debug!(
                kind = P::KIND,
                url = %self.url,
                connection = %id,
                ?event,
                "channel: stale socket event"
            );
            return None;
        };

        match event {
            SocketEvent::Opened => {
                if connection.state != ConnectionState::Connecting {
                    debug!(
                        kind = P::KIND,
                        url = %self.url,
                        connection = %id,
                        state = ?connection.state,
                        "channel: open ignored"
                    );
                    return None;
                }
                connection.state = ConnectionState::Open;
                debug!(
                    kind = P::KIND,
                    url = %self.url,
                    connection = %id,
                    flushed = self.pending.len(),
                    "channel: open"
                );
                for payload in self.pending.drain(..) {
                    connection.socket.send(payload);
                }
                if let Some(handler) = self.handlers.open.as_mut() {
                    handler();
                }
                Some(ChannelEvent::Opened)
            }
            SocketEvent::Message(payload) => match self.response_codec.decode(&payload) {
                Ok(value) => {
                    match self.handlers.receive.as_mut() {
                        Some(handler) => handler(&value),
                        None => debug!(
                            kind = P::KIND,
                            url = %self.url,
                            "channel: no receive handler; dropping response"
                        ),
                    }
                    Some(ChannelEvent::Received(value))
                }
                Err(err) => {
                    warn!(
                        kind = P::KIND,
                        url = %self.url,
                        connection = %id,
                        error = %err,
                        "channel: dropping undecodable message"
                    );
                    Some(ChannelEvent::Undecodable(err))
                }
            },
            SocketEvent::Closed => {
                self.clear_connection(id);
                match self.handlers.close.as_mut() {
                    Some(handler) => handler(),
                    None => debug!(
                        kind = P::KIND,
                        url = %self.url,
                        connection = %id,
                        "channel: closed"
                    ),
                }
                Some(ChannelEvent::Closed)
            }
            SocketEvent::Errored(reason) => {
                self.clear_connection(id);
                let err = ConnectionError {
                    url: self.url.clone(),
                    reason,
                };
                match self.handlers.error.as_mut() {
                    Some(handler) => handler(&err),
                    None => warn!(
                        kind = P::KIND,
                        connection = %id,
                        error = %err,
                        "channel: unhandled connection error"
                    ),
                }
                Some(ChannelEvent::Errored(err))
            }
        }
    }

    /// Encode `value` with the request codec and frame it for the socket.
    pub(crate) fn encode_request(&self, value: &Value) -> Result<Bytes, ChannelError> {
        let encoded = self.request_codec.encode(value)?;
        Ok(framer::to_transport_payload(&encoded))
    }

    /// Send `payload` now if open, otherwise queue it, connecting first if
    /// there is no connection at all.
    pub(crate) fn transmit(&mut self, payload: Bytes) -> Result<(), ChannelError> {
        if let Some(connection) = self.connection.as_mut() {
            if connection.state == ConnectionState::Open {
                connection.socket.send(payload);
                return Ok(());
            }
        }

        if self.pending.len() >= self.max_pending {
            return Err(ChannelError::QueueFull(self.pending.len()));
        }
        self.pending.push_back(payload);
        if self.connection.is_none() {
            self.connect();
        }
        Ok(())
    }

    fn connect(&mut self) {
        self.next_connection += 1;
        let id = ConnectionId(self.next_connection);
        let sink = EventSink::new(id, self.events_tx.clone());
        debug!(kind = P::KIND, url = %self.url, connection = %id, "channel: connecting");
        let socket = self.connector.connect(&self.url, sink);
        self.connection = Some(Connection {
            id,
            socket,
            state: ConnectionState::Connecting,
        });
    }

    fn clear_connection(&mut self, id: ConnectionId) {
        self.connection = None;
        if !self.pending.is_empty() {
            warn!(
                kind = P::KIND,
                url = %self.url,
                connection = %id,
                dropped = self.pending.len(),
                "channel: dropping unsent requests"
            );
            self.pending.clear();
        }
    }
}

impl<P: Policy, C: Connector> std::fmt::Debug for Channel<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("kind", &P::KIND)
            .field("url", &self.url)
            .field("request", &self.request_codec.type_name())
            .field("response", &self.response_codec.type_name())
            .field("state", &self.state())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
