//! Listen address parsing
//!
//! Subscribers and publishers are configured with a single `"host:port"`
//! string. The string is split once, at start time, into a host and a port.

use crate::error::{DialogueError, DialogueResult};
use std::fmt;
use std::str::FromStr;

/// A `host:port` pair
///
/// # Accepted forms
/// - `127.0.0.1:9100`
/// - `localhost:9100`
/// - `[::1]:9100` (brackets are stripped from the host)
///
/// The host is not resolved here; name resolution happens when the address is
/// bound or connected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenAddress {
    host: String,
    port: u16,
}

impl ListenAddress {
    /// Create an address from an already split host and port
    ///
    /// # Errors
    /// Returns `InvalidAddress` if the host is empty or the port is 0
    pub fn new(host: impl Into<String>, port: u16) -> DialogueResult<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(DialogueError::InvalidAddress("host is empty".to_string()));
        }
        if port == 0 {
            return Err(DialogueError::InvalidAddress(
                "port must be in range 1-65535".to_string(),
            ));
        }
        Ok(Self { host, port })
    }

    /// Parse a `host:port` string
    ///
    /// # Errors
    /// Returns `InvalidAddress` if the string contains whitespace, the colon
    /// is missing, the host is empty or the port is not a number in 1-65535.
    pub fn parse(address: &str) -> DialogueResult<Self> {
        if address.chars().any(char::is_whitespace) {
            return Err(DialogueError::InvalidAddress(format!(
                "whitespace in '{}'",
                address
            )));
        }
        let (host, port) = address.rsplit_once(':').ok_or_else(|| {
            DialogueError::InvalidAddress(format!("missing ':' in '{}'", address))
        })?;

        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(|| {
                DialogueError::InvalidAddress(format!("unterminated '[' in '{}'", address))
            })?,
            // A bare IPv6 literal has more colons and is ambiguous without brackets
            None if host.contains(':') => {
                return Err(DialogueError::InvalidAddress(format!(
                    "IPv6 host must be bracketed in '{}'",
                    address
                )));
            }
            None => host,
        };

        let port = port.parse::<u16>().map_err(|e| {
            DialogueError::InvalidAddress(format!(
                "invalid port '{}' in '{}': {}",
                port, address, e
            ))
        })?;

        Self::new(host, port)
    }

    /// Host part, without IPv6 brackets
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for ListenAddress {
    type Err = DialogueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
