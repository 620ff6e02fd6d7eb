//! Channel tuning parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_PENDING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Upper bound on the websocket handshake. `None` waits forever.
    pub connect_timeout: Option<Duration>,
    /// Requests a channel will hold while its connection is opening.
    pub max_pending: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)),
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl ChannelConfig {
    /// Build config from the process environment.
    ///
    /// Optional:
    /// - `VT_CONNECT_TIMEOUT_MS`: default 10000, `0` disables the timeout
    /// - `VT_MAX_PENDING`: default 64, must be at least 1
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let connect_timeout = match parse_var::<u64>(&lookup, "VT_CONNECT_TIMEOUT_MS") {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => Some(Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)),
        };
        let max_pending = parse_var::<usize>(&lookup, "VT_MAX_PENDING")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_PENDING);

        Self {
            connect_timeout,
            max_pending,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    lookup(key).and_then(|raw| raw.trim().parse::<T>().ok())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
