//! # channels
//!
//! Client side of the virtual tower websocket services: each logical RPC or
//! server stream is one websocket to `/service/<service>/<method>` carrying
//! protobuf messages, one message per binary frame.
//!
//! SYSTEM CONTEXT
//! ==============
//! `protos` owns schemas and the codec registry. This crate binds a URL and a
//! request/response schema pair into a [`Channel`], connects lazily, encodes
//! outgoing JSON-shaped values, and decodes incoming frames for the caller's
//! callbacks. [`RpcChannel`] sends requests; [`StreamChannel`] subscribes and
//! unsubscribes. The socket itself sits behind [`Connector`], with
//! [`WsConnector`] as the tokio-tungstenite implementation.

pub mod channel;
pub mod config;
pub mod error;
pub mod framer;
pub mod rpc;
pub mod stream;
pub mod transport;
pub mod url;
pub mod ws;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use channel::{Channel, ChannelEvent, ConnectionState, Policy, RequestResponse, Subscription};
pub use config::ChannelConfig;
pub use error::{ChannelError, ConnectionError, UrlError};
pub use rpc::RpcChannel;
pub use stream::StreamChannel;
pub use transport::{ConnectionId, Connector, EventSink, Socket, SocketEvent};
pub use url::UrlBuilder;
pub use ws::{WsConnector, WsSocket};
