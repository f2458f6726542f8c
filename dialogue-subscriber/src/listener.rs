//! Accept loop and per-session message handling
//!
//! The accept loop owns the bound `TcpListener` and one task per accepted
//! session. Each session reads frames, decodes fire-and-forget payloads and
//! dispatches them in arrival order. Nothing is ever written back.

use crate::config::SubscriberConfig;
use crate::handler::{DispatchOutcome, EventHandler, dispatch};
use crate::state::Lifecycle;
use async_trait::async_trait;
use dialogue_core::{DialogueError, EventCodec};
use dialogue_session::{Frame, FrameSession, FrameType};
use dialogue_transport::TcpTransport;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

/// Pause after a failed accept before trying again
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Handle to a running accept loop
///
/// Dropping the handle aborts the loop, which closes the listener and every
/// open session.
pub(crate) struct ServerHandle {
    local_addr: SocketAddr,
    generation: u64,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop accepting, close all sessions and wait until the listener socket
    /// is released. In-flight messages are not drained.
    pub(crate) async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandle")
            .field("local_addr", &self.local_addr)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Source of inbound connections for the accept loop
#[async_trait]
pub(crate) trait Acceptor: Send + 'static {
    fn local_addr(&self) -> io::Result<SocketAddr>;

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Acceptor for TcpListener {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Spawn the accept loop for `listener`
///
/// The loop reports an unexpected stop back through `lifecycle`. It only
/// holds a weak reference so a dropped subscriber does not keep it alive.
pub(crate) fn spawn<A: Acceptor, C: EventCodec>(
    listener: A,
    sessions: SessionHandler<C>,
    config: &SubscriberConfig,
    lifecycle: Weak<Mutex<Lifecycle>>,
    generation: u64,
) -> io::Result<ServerHandle> {
    let local_addr = listener.local_addr()?;
    let (shutdown, shutdown_rx) = watch::channel(false);

    let accept_loop = AcceptLoop {
        listener,
        sessions,
        max_accept_errors: config.max_accept_errors,
        local_addr,
    };
    let task = tokio::spawn(async move {
        if accept_loop.run(shutdown_rx).await == LoopExit::Dropped {
            if let Some(lifecycle) = lifecycle.upgrade() {
                let released = lifecycle.lock().mark_dropped(generation);
                drop(released);
            }
        }
    });

    Ok(ServerHandle {
        local_addr,
        generation,
        shutdown,
        task,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Shutdown,
    Dropped,
}

struct AcceptLoop<A: Acceptor, C: EventCodec> {
    listener: A,
    sessions: SessionHandler<C>,
    max_accept_errors: u32,
    local_addr: SocketAddr,
}

impl<A: Acceptor, C: EventCodec> AcceptLoop<A, C> {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> LoopExit {
        let mut running = JoinSet::new();
        let mut failures = 0u32;

        log::info!("Subscriber listening on {}", self.local_addr);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    log::debug!("Listener on {} shutting down", self.local_addr);
                    return LoopExit::Shutdown;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        failures = 0;
                        log::debug!("Accepted session from {}", peer);
                        let sessions = self.sessions.clone();
                        running.spawn(sessions.run(stream, peer));
                    }
                    Err(e) => {
                        failures += 1;
                        log::error!("Error accepting connection on {}: {}", self.local_addr, e);
                        if self.max_accept_errors != 0 && failures >= self.max_accept_errors {
                            log::warn!(
                                "Listener on {} dropped after {} consecutive accept errors",
                                self.local_addr,
                                failures
                            );
                            return LoopExit::Dropped;
                        }
                        tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                },
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            log::error!("Session task on {} panicked: {}", self.local_addr, e);
                        }
                    }
                }
            }
        }
    }
}

/// Per-session message handler
///
/// Cloned once per accepted session; clones share the codec and the handler.
pub(crate) struct SessionHandler<C: EventCodec> {
    codec: Arc<C>,
    handler: Arc<dyn EventHandler<C::Event>>,
    config: SubscriberConfig,
}

impl<C: EventCodec> Clone for SessionHandler<C> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            handler: Arc::clone(&self.handler),
            config: self.config.clone(),
        }
    }
}

impl<C: EventCodec> SessionHandler<C> {
    pub(crate) fn new(
        codec: Arc<C>,
        handler: Arc<dyn EventHandler<C::Event>>,
        config: SubscriberConfig,
    ) -> Self {
        Self {
            codec,
            handler,
            config,
        }
    }

    /// Serve one accepted connection until the peer leaves or the framing
    /// breaks
    async fn run(self, stream: TcpStream, peer: SocketAddr) {
        let read_timeout = self.config.read_timeout;
        let transport = match TcpTransport::from_connected_stream(stream, read_timeout) {
            Ok(transport) => transport,
            Err(e) => {
                log::warn!("Dropping session from {}: {}", peer, e);
                return;
            }
        };
        let mut session =
            FrameSession::accepted(transport).with_max_frame_length(self.config.max_frame_length);

        loop {
            match session.receive().await {
                Ok(Some(frame)) => self.on_frame(frame, peer).await,
                Ok(None) => {
                    log::debug!("Session from {} closed by peer", peer);
                    break;
                }
                Err(DialogueError::Timeout) => {
                    log::debug!("Session from {} idle, closing", peer);
                    break;
                }
                Err(e) => {
                    log::warn!("Closing session from {}: {}", peer, e);
                    break;
                }
            }
        }

        let _ = session.close().await;
    }

    async fn on_frame(&self, frame: Frame, peer: SocketAddr) {
        match frame.frame_type() {
            FrameType::FireAndForget => {
                self.fire_and_forget(frame.data()).await;
            }
            FrameType::Setup => log::debug!("Session setup from {}", peer),
            FrameType::KeepAlive => log::trace!("Keepalive from {}", peer),
            FrameType::Other(code) => {
                log::warn!("Ignoring frame type 0x{:04X} from {}", code, peer)
            }
        }
    }

    /// Decode one payload and hand it to the handler
    ///
    /// # Returns
    /// `None` if the payload could not be decoded and was dropped
    pub(crate) async fn fire_and_forget(&self, data: &[u8]) -> Option<DispatchOutcome> {
        let event = match self.codec.decode_bytes(data) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Dropping undecodable payload ({} bytes): {}", data.len(), e);
                return None;
            }
        };

        let outcome = dispatch(&self.handler, event, self.config.handler_timeout).await;
        match outcome {
            DispatchOutcome::Delivered => {}
            DispatchOutcome::Panicked => log::error!("Event handler panicked"),
            DispatchOutcome::Late => log::debug!("Slow event handler finished"),
            DispatchOutcome::Cancelled => log::warn!("Event handler invocation was cancelled"),
        }
        Some(outcome)
    }
}
