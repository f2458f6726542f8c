//! Publisher configuration

use dialogue_session::DEFAULT_MAX_FRAME_LENGTH;
use std::time::Duration;

/// Publisher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Timeout for establishing the TCP connection
    pub connect_timeout: Option<Duration>,
    /// Timeout for writing one frame
    pub write_timeout: Option<Duration>,
    /// Largest payload the publisher will send; should match the subscriber
    pub max_frame_length: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            write_timeout: Some(Duration::from_secs(30)),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl PublisherConfig {
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_max_frame_length(mut self, max_frame_length: u32) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }
}
