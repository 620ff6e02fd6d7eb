//! Conversion between codec output and websocket payloads.

use bytes::Bytes;

/// Copy exactly the bytes of `view` into an owned transport payload.
///
/// `view` may be a window into a larger buffer; nothing outside the window is
/// carried, and the payload does not observe later writes to the source.
#[must_use]
pub fn to_transport_payload(view: &[u8]) -> Bytes {
    Bytes::copy_from_slice(view)
}

#[cfg(test)]
#[path = "framer_test.rs"]
mod tests;
