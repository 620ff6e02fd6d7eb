//! Endpoint construction for `/service/<service>/<method>` websockets.

use crate::error::UrlError;

/// Builds websocket endpoint URLs against one host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlBuilder {
    scheme: &'static str,
    host: String,
}

impl UrlBuilder {
    /// Plain `ws://` endpoints on `host` (`hostname` or `hostname:port`).
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            scheme: "ws",
            host: host.into(),
        }
    }

    /// Derive the websocket host from an HTTP(S) or WS(S) base URL.
    ///
    /// `https` and `wss` map to `wss`; `http` and `ws` map to `ws`. Any path
    /// on the base URL is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`UrlError`] for other schemes or an empty host.
    pub fn from_base_url(base_url: &str) -> Result<Self, UrlError> {
        let trimmed = base_url.trim();
        let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
            ("wss", rest)
        } else if let Some(rest) = trimmed.strip_prefix("wss://") {
            ("wss", rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            ("ws", rest)
        } else if let Some(rest) = trimmed.strip_prefix("ws://") {
            ("ws", rest)
        } else {
            return Err(UrlError::UnsupportedScheme(base_url.to_owned()));
        };

        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(UrlError::MissingHost(base_url.to_owned()));
        }

        Ok(Self {
            scheme,
            host: host.to_owned(),
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `ws://<host>/service/<service>/<method>`
    #[must_use]
    pub fn build_url(&self, service: &str, method: &str) -> String {
        format!("{}://{}/service/{service}/{method}", self.scheme, self.host)
    }
}

#[cfg(test)]
#[path = "url_test.rs"]
mod tests;
