//! tokio-tungstenite implementation of [`Connector`].
//!
//! DESIGN
//! ======
//! Every socket runs as its own spawned task. The channel-facing
//! [`WsSocket`] only pushes commands onto an unbounded queue, so `send` and
//! `close` never block the caller. The task reports `Opened`, each binary
//! message, and exactly one terminal `Closed` or `Errored` through its
//! [`EventSink`].

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::config::ChannelConfig;
use crate::transport::{Connector, EventSink, Socket, SocketEvent};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// How long a locally initiated close waits for the peer's close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
enum WsError {
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("timed out after {0:?} waiting for websocket handshake")]
    ConnectTimeout(Duration),
    #[error("websocket transport failed: {0}")]
    Socket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("no tokio runtime")]
    NoRuntime,
}

enum Outbound {
    Payload(Bytes),
    Close,
}

/// Opens real websocket connections on the current Tokio runtime.
#[derive(Clone, Debug)]
pub struct WsConnector {
    connect_timeout: Option<Duration>,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::from_config(&ChannelConfig::default())
    }
}

impl WsConnector {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    #[must_use]
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::new(config.connect_timeout)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }
}

impl Connector for WsConnector {
    type Socket = WsSocket;

    /// Spawns the socket task on the current Tokio runtime. Outside a runtime
    /// the connection fails with an `Errored` event instead.
    fn connect(&mut self, url: &str, events: EventSink) -> WsSocket {
        let (tx, rx) = mpsc::unbounded_channel();
        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(run_socket(url.to_owned(), self.connect_timeout, rx, events));
            }
            Err(err) => {
                let connection = events.id();
                debug!(%url, %connection, error = %err, "ws: no runtime to connect on");
                events.emit(SocketEvent::Errored(WsError::NoRuntime.to_string()));
            }
        }
        WsSocket { tx }
    }
}

/// Handle to a socket task. Dropping it closes the socket.
#[derive(Debug)]
pub struct WsSocket {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Socket for WsSocket {
    fn send(&mut self, payload: Bytes) {
        if self.tx.send(Outbound::Payload(payload)).is_err() {
            debug!("ws: send after socket task exited");
        }
    }

    fn close(&mut self) {
        if self.tx.send(Outbound::Close).is_err() {
            debug!("ws: close after socket task exited");
        }
    }
}

async fn run_socket(
    url: String,
    connect_timeout: Option<Duration>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: EventSink,
) {
    let connection = events.id();

    let stream = tokio::select! {
        opened = open(&url, connect_timeout) => match opened {
            Ok(stream) => stream,
            Err(err) => {
                debug!(%url, %connection, error = %err, "ws: connect failed");
                events.emit(SocketEvent::Errored(err.to_string()));
                return;
            }
        },
        () = wait_for_close(&mut outbound) => {
            debug!(%url, %connection, "ws: closed before handshake completed");
            events.emit(SocketEvent::Closed);
            return;
        }
    };

    debug!(%url, %connection, "ws: open");
    events.emit(SocketEvent::Opened);

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Payload(payload)) => {
                    if let Err(err) = write.send(Message::Binary(payload)).await {
                        let err = WsError::Socket(Box::new(err));
                        debug!(%url, %connection, error = %err, "ws: send failed");
                        events.emit(SocketEvent::Errored(err.to_string()));
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    close_gracefully(&mut write, &mut read).await;
                    debug!(%url, %connection, "ws: closed locally");
                    events.emit(SocketEvent::Closed);
                    return;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Binary(payload))) => events.emit(SocketEvent::Message(payload)),
                Some(Ok(Message::Text(text))) => {
                    // The proxy reports failed backend calls as text frames.
                    warn!(%url, %connection, text = %text.as_str(), "ws: ignoring text frame");
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(%url, %connection, "ws: closed by peer");
                    events.emit(SocketEvent::Closed);
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    let err = WsError::Socket(Box::new(err));
                    debug!(%url, %connection, error = %err, "ws: receive failed");
                    events.emit(SocketEvent::Errored(err.to_string()));
                    return;
                }
            },
        }
    }
}

async fn open(url: &str, connect_timeout: Option<Duration>) -> Result<WsStream, WsError> {
    let handshake = connect_async(url);
    let result = match connect_timeout {
        Some(limit) => tokio::time::timeout(limit, handshake)
            .await
            .map_err(|_| WsError::ConnectTimeout(limit))?,
        None => handshake.await,
    };
    let (stream, _) = result.map_err(|e| WsError::Connect(Box::new(e)))?;
    Ok(stream)
}

/// Resolve once a close is requested or the handle is dropped. Channels only
/// send after `Opened`, so nothing else arrives before the handshake.
async fn wait_for_close(outbound: &mut mpsc::UnboundedReceiver<Outbound>) {
    while let Some(Outbound::Payload(_)) = outbound.recv().await {
        debug!("ws: payload before handshake dropped");
    }
}

async fn close_gracefully(
    write: &mut SplitSink<WsStream, Message>,
    read: &mut SplitStream<WsStream>,
) {
    if let Err(err) = write.send(Message::Close(None)).await {
        debug!(error = %err, "ws: close frame not sent");
        return;
    }
    let drain = async { while let Some(Ok(_)) = read.next().await {} };
    if tokio::time::timeout(CLOSE_GRACE, drain).await.is_err() {
        debug!("ws: peer did not finish close handshake");
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
