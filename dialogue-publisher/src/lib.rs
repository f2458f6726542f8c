//! Event publisher
//!
//! The sending side of a dialogue: connects to a subscriber and writes one
//! fire-and-forget frame per event. It never waits for the subscriber to
//! process anything.

pub mod config;
pub mod publisher;

pub use config::PublisherConfig;
pub use publisher::EventPublisher;
