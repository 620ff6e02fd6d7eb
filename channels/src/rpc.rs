//! Request/response channel (`send` one request, receive its response).

use serde_json::Value;

use crate::channel::{Channel, RequestResponse};
use crate::error::ChannelError;
use crate::transport::Connector;
use crate::ws::WsConnector;

/// Fire-and-forget request channel over one lazily opened socket.
pub type RpcChannel<C = WsConnector> = Channel<RequestResponse, C>;

impl<C: Connector> Channel<RequestResponse, C> {
    /// Encode and transmit `request`.
    ///
    /// Without a connection this starts one and queues the request; every
    /// request queued while connecting is sent, in call order, once the socket
    /// opens. Responses arrive through [`Channel::on_receive`].
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Encode`] if `request` does not match the request
    /// schema (nothing is sent), or [`ChannelError::QueueFull`] if too many
    /// requests are already waiting for the connection.
    pub fn send(&mut self, request: &Value) -> Result<(), ChannelError> {
        let payload = self.encode_request(request)?;
        self.transmit(payload)
    }
}

#[cfg(test)]
#[path = "rpc_test.rs"]
mod tests;
