//! Session layer module for the dialogue event subscriber
//!
//! A session carries length-prefixed frames over a transport. Only one-way
//! traffic is defined: the publisher sends SETUP once, then any number of
//! FIRE_AND_FORGET frames; nothing is ever sent back.

pub mod frame;
pub mod session;

pub use dialogue_core::{DialogueError, DialogueResult};
pub use frame::{
    DEFAULT_MAX_FRAME_LENGTH, FRAME_HEADER_LENGTH, Frame, FrameHeader, FrameType, PROTOCOL_VERSION,
};
pub use session::FrameSession;
