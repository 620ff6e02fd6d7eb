//! Error types surfaced by channels.
//!
//! ERROR HANDLING
//! ==============
//! Caller bugs (unknown schema names, malformed requests, stopping a stream
//! that is not running) are returned synchronously as [`ChannelError`].
//! Transport failures never escape a channel method: they arrive later as a
//! [`ConnectionError`] through the error callback and [`crate::ChannelEvent`].

/// Error returned synchronously by channel methods.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// A request or response type name was never registered.
    #[error(transparent)]
    MissingCodec(#[from] protos::RegistryError),
    /// The request could not be encoded with the bound request codec.
    #[error(transparent)]
    Encode(#[from] protos::CodecError),
    /// Too many requests are waiting for the connection to open.
    #[error("pending queue is full ({0} requests waiting for the connection to open)")]
    QueueFull(usize),
    /// `stop()` was called without a live connection.
    #[error("channel is not running")]
    NotRunning,
}

/// Socket-level failure reported through the error callback.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("connection to {url} failed: {reason}")]
pub struct ConnectionError {
    /// Endpoint the channel is bound to.
    pub url: String,
    /// Transport description of what went wrong.
    pub reason: String,
}

/// Error returned by [`crate::UrlBuilder::from_base_url`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    /// The base URL scheme is not one of `http`, `https`, `ws`, `wss`.
    #[error("unsupported base URL scheme: {0}")]
    UnsupportedScheme(String),
    /// The base URL has no host.
    #[error("base URL has no host: {0}")]
    MissingHost(String),
}
