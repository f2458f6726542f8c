//! Transport layer module for the dialogue event subscriber
//!
//! This crate provides the stream abstraction used by the session layer and
//! its TCP implementation.

pub mod stream;
pub mod tcp;

pub use dialogue_core::{DialogueError, DialogueResult};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{TcpSettings, TcpTransport};
