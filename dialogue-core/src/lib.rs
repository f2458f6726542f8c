//! Core types and utilities for the dialogue event subscriber
//!
//! This crate provides the error type, listen address parsing, the payload
//! codec abstraction and the default `DialogueEvent` shared by every layer.

pub mod address;
pub mod codec;
pub mod error;
pub mod event;

pub use address::ListenAddress;
pub use codec::{EventCodec, JsonCodec};
pub use error::{DialogueError, DialogueResult};
pub use event::DialogueEvent;
