//! Event handlers and dispatch

use std::sync::Arc;
use std::time::Duration;

/// Receives decoded events
///
/// A subscriber holds exactly one handler and calls it once per decoded
/// message. Sessions run concurrently, so the handler may be invoked from
/// several threads at once. Within one session calls are sequential and in
/// arrival order.
///
/// Any `Fn(E) + Send + Sync` closure is a handler:
///
/// ```
/// use dialogue_subscriber::EventHandler;
///
/// let handler = |event: String| println!("received {}", event);
/// handler.handle("hello".to_string());
/// ```
pub trait EventHandler<E>: Send + Sync {
    fn handle(&self, event: E);
}

impl<E, F> EventHandler<E> for F
where
    F: Fn(E) + Send + Sync,
{
    fn handle(&self, event: E) {
        self(event)
    }
}

/// What happened to one handler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler returned
    Delivered,
    /// The handler panicked
    Panicked,
    /// The handler returned, but only after the configured timeout elapsed
    Late,
    /// The runtime cancelled the invocation (shutdown)
    Cancelled,
}

/// Invoke `handler` on the blocking pool and wait for it to return
///
/// Panics are contained in the blocking task and reported as
/// `DispatchOutcome::Panicked`. If `watchdog` elapses first a warning is
/// logged and the wait continues, so at most one invocation per session is
/// ever in flight.
pub(crate) async fn dispatch<E>(
    handler: &Arc<dyn EventHandler<E>>,
    event: E,
    watchdog: Option<Duration>,
) -> DispatchOutcome
where
    E: Send + 'static,
{
    let handler = Arc::clone(handler);
    let mut task = tokio::task::spawn_blocking(move || handler.handle(event));

    let (joined, late) = match watchdog {
        Some(limit) => {
            let first = tokio::time::timeout(limit, &mut task).await;
            match first {
                Ok(joined) => (joined, false),
                Err(_) => {
                    log::warn!("Event handler still running after {:?}", limit);
                    (task.await, true)
                }
            }
        }
        None => (task.await, false),
    };

    match joined {
        Ok(()) if late => DispatchOutcome::Late,
        Ok(()) => DispatchOutcome::Delivered,
        Err(e) if e.is_panic() => DispatchOutcome::Panicked,
        Err(_) => DispatchOutcome::Cancelled,
    }
}
