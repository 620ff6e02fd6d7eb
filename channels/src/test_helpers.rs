//! Test-only connector that records what channels do to their sockets and
//! lets tests inject socket events by hand.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use protos::ProtoRegistry;
use serde_json::Value;

use crate::transport::{Connector, EventSink, Socket, SocketEvent};

pub(crate) const ECHO_REQUEST: &str = "tvsc.service.echo.EchoRequest";
pub(crate) const ECHO_REPLY: &str = "tvsc.service.echo.EchoReply";
pub(crate) const DATETIME_REQUEST: &str = "tvsc.service.datetime.DatetimeRequest";
pub(crate) const DATETIME_REPLY: &str = "tvsc.service.datetime.DatetimeReply";

pub(crate) const ECHO_URL: &str = "ws://host/service/echo/echo";
pub(crate) const DATETIME_URL: &str = "ws://host/service/datetime/stream_datetime";

#[derive(Debug)]
pub(crate) struct MockSocketState {
    pub(crate) url: String,
    pub(crate) events: EventSink,
    pub(crate) sent: Vec<Bytes>,
    pub(crate) close_requests: usize,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MockConnector {
    sockets: Arc<Mutex<Vec<MockSocketState>>>,
}

impl MockConnector {
    fn lock(&self) -> MutexGuard<'_, Vec<MockSocketState>> {
        self.sockets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn url(&self, index: usize) -> String {
        self.lock()[index].url.clone()
    }

    pub(crate) fn sent(&self, index: usize) -> Vec<Bytes> {
        self.lock()[index].sent.clone()
    }

    pub(crate) fn close_requests(&self, index: usize) -> usize {
        self.lock()[index].close_requests
    }

    /// Deliver `event` as if socket `index` produced it.
    pub(crate) fn emit(&self, index: usize, event: SocketEvent) {
        let sink = self.lock()[index].events.clone();
        sink.emit(event);
    }
}

pub(crate) struct MockSocket {
    sockets: Arc<Mutex<Vec<MockSocketState>>>,
    index: usize,
}

impl MockSocket {
    fn with_state(&self, f: impl FnOnce(&mut MockSocketState)) {
        let mut sockets = self.sockets.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut sockets[self.index]);
    }
}

impl Socket for MockSocket {
    fn send(&mut self, payload: Bytes) {
        self.with_state(|s| s.sent.push(payload));
    }

    fn close(&mut self) {
        self.with_state(|s| s.close_requests += 1);
    }
}

impl Connector for MockConnector {
    type Socket = MockSocket;

    fn connect(&mut self, url: &str, events: EventSink) -> MockSocket {
        let mut sockets = self.lock();
        sockets.push(MockSocketState {
            url: url.to_owned(),
            events,
            sent: Vec::new(),
            close_requests: 0,
        });
        MockSocket {
            sockets: Arc::clone(&self.sockets),
            index: sockets.len() - 1,
        }
    }
}

pub(crate) fn registry() -> ProtoRegistry {
    ProtoRegistry::with_tvsc_services()
}

/// Encode `value` as `type_name`, as a server would put it on the wire.
pub(crate) fn wire(type_name: &str, value: &Value) -> Bytes {
    let codec = registry().resolve(type_name).expect("registered type");
    Bytes::from(codec.encode(value).expect("encodable value"))
}

/// Decode a payload a channel sent.
pub(crate) fn unwire(type_name: &str, payload: &Bytes) -> Value {
    let codec = registry().resolve(type_name).expect("registered type");
    codec.decode(payload).expect("decodable payload")
}
