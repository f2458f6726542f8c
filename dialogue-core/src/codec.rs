//! Payload codecs
//!
//! A codec turns the UTF-8 text carried by a fire-and-forget message into a
//! typed event, and back.

use crate::error::{DialogueError, DialogueResult};
use crate::event::DialogueEvent;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// Converts between wire text and typed events
///
/// Implementations are shared between all sessions of a subscriber, so they
/// must be `Send + Sync`.
pub trait EventCodec: Send + Sync + 'static {
    /// The event type produced by this codec
    type Event: Send + 'static;

    /// Decode an event from payload text
    fn decode(&self, text: &str) -> DialogueResult<Self::Event>;

    /// Encode an event into payload text
    fn encode(&self, event: &Self::Event) -> DialogueResult<String>;

    /// Decode an event from raw payload bytes
    ///
    /// # Errors
    /// Returns `InvalidPayload` if the bytes are not valid UTF-8, or whatever
    /// `decode` returns for the text.
    fn decode_bytes(&self, data: &[u8]) -> DialogueResult<Self::Event> {
        let text = std::str::from_utf8(data)
            .map_err(|e| DialogueError::InvalidPayload(format!("payload is not UTF-8: {}", e)))?;
        self.decode(text)
    }
}

/// JSON codec backed by serde_json
pub struct JsonCodec<E = DialogueEvent> {
    _event: PhantomData<fn() -> E>,
}

impl<E> JsonCodec<E> {
    pub fn new() -> Self {
        Self { _event: PhantomData }
    }
}

impl<E> Default for JsonCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for JsonCodec<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for JsonCodec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec")
            .field("event", &std::any::type_name::<E>())
            .finish()
    }
}

impl<E> EventCodec for JsonCodec<E>
where
    E: Serialize + DeserializeOwned + Send + 'static,
{
    type Event = E;

    fn decode(&self, text: &str) -> DialogueResult<E> {
        Ok(serde_json::from_str(text)?)
    }

    fn encode(&self, event: &E) -> DialogueResult<String> {
        Ok(serde_json::to_string(event)?)
    }
}
