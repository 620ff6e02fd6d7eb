//! Server-push channel with an explicit start/stop lifecycle.

use serde_json::Value;
use tracing::debug;

use crate::channel::{Channel, ConnectionState, Subscription};
use crate::error::ChannelError;
use crate::transport::{Connector, Socket};
use crate::ws::WsConnector;

/// Subscription channel: `start` opens a socket and subscribes, `stop` closes it.
pub type StreamChannel<C = WsConnector> = Channel<Subscription, C>;

impl<C: Connector> Channel<Subscription, C> {
    /// Open a connection and subscribe with an empty request.
    ///
    /// Does nothing while a connection already exists (connecting, open, or
    /// closing), so exactly one subscribe is sent per connection. The start
    /// callback runs once the subscribe has been sent.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Encode`] if the request schema cannot encode an
    /// empty message.
    pub fn start(&mut self) -> Result<(), ChannelError> {
        if self.is_running() {
            debug!(url = %self.url(), state = ?self.state(), "stream: already running");
            return Ok(());
        }
        let subscribe = self.encode_request(&Value::Object(serde_json::Map::new()))?;
        self.transmit(subscribe)
    }

    /// Close the live connection. The stop callback runs when the socket
    /// reports the close, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotRunning`] without a connection.
    pub fn stop(&mut self) -> Result<(), ChannelError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ChannelError::NotRunning);
        };
        if connection.state == ConnectionState::Closing {
            return Ok(());
        }
        connection.state = ConnectionState::Closing;
        connection.socket.close();
        self.pending.clear();
        Ok(())
    }

    /// `stop()` if running, otherwise `start()`.
    ///
    /// # Errors
    ///
    /// Propagates the error of whichever operation ran.
    pub fn toggle(&mut self) -> Result<(), ChannelError> {
        if self.is_running() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// True while a connection exists, including while it is still opening.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.has_connection()
    }

    /// Called after the subscribe request goes out on a fresh connection.
    pub fn on_start(&mut self, handler: impl FnMut() + Send + 'static) {
        self.handlers.open = Some(Box::new(handler));
    }

    /// Called when the connection closes, whoever closed it.
    pub fn on_stop(&mut self, handler: impl FnMut() + Send + 'static) {
        self.handlers.close = Some(Box::new(handler));
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
