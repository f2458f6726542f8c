//! Subscriber state machine

use crate::listener::ServerHandle;
use dialogue_core::{DialogueError, DialogueResult};

/// Subscriber lifecycle state
///
/// # State Transitions
/// ```text
/// Idle      -> Listening (start succeeded)
/// Listening -> Idle      (listener dropped unexpectedly)
/// Idle      -> Disposed  (dispose)
/// Listening -> Disposed  (dispose)
/// ```
///
/// `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriberState {
    /// Not listening; `start` may be called
    #[default]
    Idle,
    /// Bound and accepting sessions
    Listening,
    /// Shut down for good
    Disposed,
}

impl SubscriberState {
    pub fn is_listening(&self) -> bool {
        matches!(self, SubscriberState::Listening)
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, SubscriberState::Disposed)
    }

    /// Validate state transition
    ///
    /// # Errors
    /// `Disposed` when leaving the terminal state, `InvalidState` for any
    /// other transition not listed above.
    pub fn validate_transition(&self, new_state: SubscriberState) -> DialogueResult<()> {
        use SubscriberState::*;

        match (*self, new_state) {
            (Idle, Listening) | (Listening, Idle) | (Idle, Disposed) | (Listening, Disposed) => {
                Ok(())
            }
            (Disposed, _) => Err(DialogueError::Disposed),
            (from, to) => Err(DialogueError::InvalidState(format!(
                "invalid subscriber transition from {:?} to {:?}",
                from, to
            ))),
        }
    }
}

/// State shared between a subscriber and its accept loop
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    pub(crate) state: SubscriberState,
    pub(crate) server: Option<ServerHandle>,
    /// Bumped on every successful start so a stale accept loop cannot tear
    /// down its successor
    pub(crate) generation: u64,
}

impl Lifecycle {
    pub(crate) fn is_connected(&self) -> bool {
        self.state.is_listening() && self.server.is_some()
    }

    /// Record that the accept loop of `generation` stopped on its own
    ///
    /// Returns the released handle so the caller can drop it outside the lock.
    pub(crate) fn mark_dropped(&mut self, generation: u64) -> Option<ServerHandle> {
        let current = self.server.as_ref().map(ServerHandle::generation);
        if self.state.is_listening() && current == Some(generation) {
            self.state = SubscriberState::Idle;
            self.server.take()
        } else {
            None
        }
    }
}
