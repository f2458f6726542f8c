//! dialogue - fire-and-forget event delivery over TCP
//!
//! An [`EventSubscriber`] binds a `host:port`, accepts sessions and hands
//! every decoded event to a single handler. An [`EventPublisher`] is the
//! sending side.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `dialogue-core`: errors, address parsing, codecs, `DialogueEvent`
//! - `dialogue-transport`: transport layer (TCP)
//! - `dialogue-session`: one-way frame format and frame session
//! - `dialogue-subscriber`: listener lifecycle and event dispatch
//! - `dialogue-publisher`: event publisher
//!
//! # Usage
//!
//! ```no_run
//! use dialogue::{DialogueEvent, EventPublisher, EventSubscriber, JsonCodec};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> dialogue::DialogueResult<()> {
//! let subscriber = EventSubscriber::new(
//!     "127.0.0.1:9100",
//!     JsonCodec::<DialogueEvent>::new(),
//!     |event: DialogueEvent| println!("{} -> {}", event.id, event.payload),
//! );
//! subscriber.start().await?;
//!
//! let mut publisher = EventPublisher::new("127.0.0.1:9100", JsonCodec::<DialogueEvent>::new());
//! publisher.connect().await?;
//! publisher.publish(&DialogueEvent::new("a", "orders", json!({"qty": 1}))).await?;
//!
//! subscriber.dispose().await;
//! # Ok(())
//! # }
//! ```

pub use dialogue_core::{
    DialogueError, DialogueEvent, DialogueResult, EventCodec, JsonCodec, ListenAddress,
};
pub use dialogue_publisher::{EventPublisher, PublisherConfig};
pub use dialogue_subscriber::{
    DispatchOutcome, EventHandler, EventSubscriber, SubscriberConfig, SubscriberState,
};

// Re-export lower layers
pub mod session {
    pub use dialogue_session::*;
}

pub mod transport {
    pub use dialogue_transport::*;
}
