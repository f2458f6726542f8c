//! Subscriber configuration

use dialogue_session::DEFAULT_MAX_FRAME_LENGTH;
use std::time::Duration;

/// Subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Idle timeout for a session. `None` keeps idle sessions open forever.
    pub read_timeout: Option<Duration>,
    /// How long one handler invocation may run before a warning is logged.
    /// The session still waits for it, so arrival order holds. `None` never
    /// warns.
    pub handler_timeout: Option<Duration>,
    /// Largest accepted frame payload in bytes
    pub max_frame_length: u32,
    /// Consecutive accept failures after which the listener is treated as
    /// dropped. 0 never gives up.
    pub max_accept_errors: u32,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            read_timeout: None,
            handler_timeout: Some(Duration::from_secs(30)),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            max_accept_errors: 16,
        }
    }
}

impl SubscriberConfig {
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn with_max_frame_length(mut self, max_frame_length: u32) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    pub fn with_max_accept_errors(mut self, max_accept_errors: u32) -> Self {
        self.max_accept_errors = max_accept_errors;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SubscriberConfig::default();
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.handler_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_frame_length, 1024 * 1024);
        assert_eq!(config.max_accept_errors, 16);
    }

    #[test]
    fn test_builders() {
        let config = SubscriberConfig::default()
            .with_read_timeout(Some(Duration::from_secs(5)))
            .with_handler_timeout(None)
            .with_max_frame_length(512)
            .with_max_accept_errors(0);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.handler_timeout, None);
        assert_eq!(config.max_frame_length, 512);
        assert_eq!(config.max_accept_errors, 0);
    }
}
