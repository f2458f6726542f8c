use thiserror::Error;

/// Main error type for dialogue operations
#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Subscriber has been disposed")]
    Disposed,

    #[error("Not connected")]
    NotConnected,
}

/// Result type alias for dialogue operations
pub type DialogueResult<T> = Result<T, DialogueError>;
