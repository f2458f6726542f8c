//! Event subscriber lifecycle
//!
//! `EventSubscriber` owns the listener: it binds on `start`, reports whether
//! it is listening, rebinds on `refresh_connection` if the listener went away,
//! and shuts down for good on `dispose`.

use crate::config::SubscriberConfig;
use crate::handler::EventHandler;
use crate::listener::{self, SessionHandler};
use crate::state::{Lifecycle, SubscriberState};
use dialogue_core::{DialogueError, DialogueResult, EventCodec, ListenAddress};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Listens on one address and dispatches decoded fire-and-forget events
///
/// Construction performs no I/O. All async methods must run inside a tokio
/// runtime; `is_connected` and the accessors may be called from anywhere.
///
/// # Usage Example
/// ```rust,no_run
/// use dialogue_core::{DialogueEvent, JsonCodec};
/// use dialogue_subscriber::EventSubscriber;
///
/// # async fn run() {
/// let subscriber = EventSubscriber::new(
///     "127.0.0.1:9100",
///     JsonCodec::<DialogueEvent>::new(),
///     |event: DialogueEvent| println!("received {}", event.id),
/// );
///
/// if let Err(e) = subscriber.start().await {
///     eprintln!("not listening yet: {}", e);
/// }
///
/// // From a health-check timer:
/// subscriber.refresh_connection().await;
///
/// subscriber.dispose().await;
/// # }
/// ```
pub struct EventSubscriber<C: EventCodec> {
    address: String,
    config: SubscriberConfig,
    sessions: SessionHandler<C>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    /// Serializes start and dispose
    transitions: tokio::sync::Mutex<()>,
}

impl<C: EventCodec> EventSubscriber<C> {
    /// Create a subscriber with default configuration
    ///
    /// # Arguments
    /// * `address` - `host:port` to listen on; parsed when `start` runs
    /// * `codec` - Decoder for message payloads
    /// * `handler` - Receives every decoded event
    pub fn new<H>(address: impl Into<String>, codec: C, handler: H) -> Self
    where
        H: EventHandler<C::Event> + 'static,
    {
        Self::with_config(address, codec, handler, SubscriberConfig::default())
    }

    /// Create a subscriber with custom configuration
    pub fn with_config<H>(
        address: impl Into<String>,
        codec: C,
        handler: H,
        config: SubscriberConfig,
    ) -> Self
    where
        H: EventHandler<C::Event> + 'static,
    {
        let handler: Arc<dyn EventHandler<C::Event>> = Arc::new(handler);
        Self {
            address: address.into(),
            sessions: SessionHandler::new(Arc::new(codec), handler, config.clone()),
            config,
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
            transitions: tokio::sync::Mutex::new(()),
        }
    }

    /// Start listening
    ///
    /// Parses the address, binds it and spawns the accept loop. Returns once
    /// the socket is bound. Already listening is a no-op.
    ///
    /// Failures are logged and leave the subscriber not connected, so callers
    /// that only poll `is_connected` may ignore the result.
    ///
    /// # Errors
    /// - `InvalidAddress` for a malformed address
    /// - `Bind` if the address cannot be bound (for example, port in use)
    /// - `Disposed` after `dispose`
    pub async fn start(&self) -> DialogueResult<()> {
        let _transition = self.transitions.lock().await;

        match self.bind_and_spawn().await {
            Ok(()) => Ok(()),
            Err(DialogueError::Disposed) => {
                log::debug!("Subscriber at {} is disposed, not starting", self.address);
                Err(DialogueError::Disposed)
            }
            Err(e) => {
                log::error!("Exception while listening on {}: {}", self.address, e);
                Err(e)
            }
        }
    }

    async fn bind_and_spawn(&self) -> DialogueResult<()> {
        {
            let lifecycle = self.lifecycle.lock();
            if lifecycle.state.is_disposed() {
                return Err(DialogueError::Disposed);
            }
            if lifecycle.is_connected() {
                return Ok(());
            }
        }

        let address = ListenAddress::parse(&self.address)?;
        let tcp = TcpListener::bind((address.host(), address.port()))
            .await
            .map_err(|source| DialogueError::Bind {
                address: address.to_string(),
                source,
            })?;

        let mut lifecycle = self.lifecycle.lock();
        lifecycle.state.validate_transition(SubscriberState::Listening)?;

        let generation = lifecycle.generation + 1;
        let server = listener::spawn(
            tcp,
            self.sessions.clone(),
            &self.config,
            Arc::downgrade(&self.lifecycle),
            generation,
        )?;

        lifecycle.generation = generation;
        lifecycle.server = Some(server);
        lifecycle.state = SubscriberState::Listening;
        Ok(())
    }

    /// Whether the subscriber currently holds a listening socket
    pub fn is_connected(&self) -> bool {
        self.lifecycle.lock().is_connected()
    }

    /// Shut down for good
    ///
    /// Stops accepting, closes open sessions without draining them and
    /// releases the socket. Safe to call repeatedly and without a prior
    /// `start`.
    pub async fn dispose(&self) {
        let _transition = self.transitions.lock().await;

        let server = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.state.is_disposed() {
                log::info!("Disposing subscriber at {}", self.address);
                lifecycle.state = SubscriberState::Disposed;
            }
            lifecycle.server.take()
        };

        if let Some(server) = server {
            server.shutdown().await;
        }
    }

    /// Restart listening if the listener was lost
    ///
    /// Does nothing after `dispose`. Intended to be called periodically by
    /// an external timer; the subscriber never schedules retries itself.
    pub async fn refresh_connection(&self) {
        if self.state().is_disposed() {
            log::trace!("Shutdown in progress for {}, refresh cancelled", self.address);
            return;
        }

        if !self.is_connected() {
            log::info!("Subscriber @ {} not listening, starting again", self.address);
            // start() has already logged the failure
            let _ = self.start().await;
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SubscriberState {
        self.lifecycle.lock().state
    }

    /// Bound socket address while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lifecycle.lock().server.as_ref().map(|server| server.local_addr())
    }

    /// Configured `host:port`
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::{DialogueEvent, JsonCodec};

    fn subscriber(address: &str) -> EventSubscriber<JsonCodec> {
        EventSubscriber::new(address, JsonCodec::new(), |_: DialogueEvent| {})
    }

    fn free_address() -> String {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("127.0.0.1:{}", probe.local_addr().unwrap().port())
    }

    #[test]
    fn test_construction_does_no_io() {
        let subscriber = subscriber("not an address");
        assert_eq!(subscriber.state(), SubscriberState::Idle);
        assert!(!subscriber.is_connected());
        assert!(subscriber.local_addr().is_none());
        assert_eq!(subscriber.address(), "not an address");
    }

    #[tokio::test]
    async fn test_start_on_free_port() {
        let address = free_address();
        let subscriber = subscriber(&address);

        subscriber.start().await.unwrap();
        assert!(subscriber.is_connected());
        assert_eq!(subscriber.state(), SubscriberState::Listening);
        assert_eq!(subscriber.local_addr().unwrap().to_string(), address);

        subscriber.dispose().await;
    }

    #[tokio::test]
    async fn test_start_twice_keeps_listener() {
        let subscriber = subscriber(&free_address());
        subscriber.start().await.unwrap();
        let first = subscriber.local_addr();

        subscriber.start().await.unwrap();
        assert!(subscriber.is_connected());
        assert_eq!(subscriber.local_addr(), first);
        assert_eq!(subscriber.lifecycle.lock().generation, 1);

        subscriber.dispose().await;
    }

    #[tokio::test]
    async fn test_malformed_addresses_do_not_connect() {
        for bad in ["localhost", "localhost:abc", "127.0.0.1:", "127.0.0.1:0", ":9100"] {
            let subscriber = subscriber(bad);
            let result = subscriber.start().await;
            assert!(
                matches!(result, Err(DialogueError::InvalidAddress(_))),
                "{}: {:?}",
                bad,
                result
            );
            assert!(!subscriber.is_connected());
            assert_eq!(subscriber.state(), SubscriberState::Idle);
        }
    }

    #[tokio::test]
    async fn test_port_in_use_does_not_connect() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = occupied.local_addr().unwrap().to_string();
        let subscriber = subscriber(&address);

        assert!(matches!(subscriber.start().await, Err(DialogueError::Bind { .. })));
        assert!(!subscriber.is_connected());
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let subscriber = subscriber(&free_address());
        subscriber.start().await.unwrap();

        subscriber.dispose().await;
        subscriber.dispose().await;
        assert!(!subscriber.is_connected());
        assert_eq!(subscriber.state(), SubscriberState::Disposed);
    }

    #[tokio::test]
    async fn test_dispose_without_start() {
        let subscriber = subscriber(&free_address());
        subscriber.dispose().await;
        assert_eq!(subscriber.state(), SubscriberState::Disposed);
    }

    #[tokio::test]
    async fn test_dispose_releases_port() {
        let address = free_address();
        let first = subscriber(&address);
        first.start().await.unwrap();
        first.dispose().await;

        let second = subscriber(&address);
        second.start().await.unwrap();
        assert!(second.is_connected());
        second.dispose().await;
    }

    #[tokio::test]
    async fn test_refresh_after_dispose_never_restarts() {
        let subscriber = subscriber(&free_address());
        subscriber.start().await.unwrap();
        subscriber.dispose().await;

        subscriber.refresh_connection().await;
        assert!(!subscriber.is_connected());
        assert!(subscriber.lifecycle.lock().server.is_none());
        assert!(matches!(subscriber.start().await, Err(DialogueError::Disposed)));
        assert_eq!(subscriber.state(), SubscriberState::Disposed);
    }

    #[tokio::test]
    async fn test_refresh_restarts_dropped_listener() {
        let subscriber = subscriber(&free_address());
        subscriber.start().await.unwrap();

        // Simulate the accept loop giving up
        let released = subscriber.lifecycle.lock().mark_dropped(1);
        released.expect("listener handle").shutdown().await;
        assert!(!subscriber.is_connected());
        assert_eq!(subscriber.state(), SubscriberState::Idle);

        subscriber.refresh_connection().await;
        assert!(subscriber.is_connected());
        assert_eq!(subscriber.lifecycle.lock().generation, 2);

        subscriber.dispose().await;
    }

    #[tokio::test]
    async fn test_refresh_retries_after_failed_start() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = occupied.local_addr().unwrap().to_string();
        let subscriber = subscriber(&address);

        subscriber.refresh_connection().await;
        assert!(!subscriber.is_connected());

        drop(occupied);
        subscriber.refresh_connection().await;
        assert!(subscriber.is_connected());

        subscriber.dispose().await;
    }
}
