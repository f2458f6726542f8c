//! Event publisher implementation

use crate::config::PublisherConfig;
use bytes::Bytes;
use dialogue_core::{DialogueError, DialogueResult, EventCodec, ListenAddress};
use dialogue_session::{Frame, FrameSession};
use dialogue_transport::{StreamAccessor, TcpSettings, TcpTransport};

/// Sends events to a subscriber over one session
///
/// # Usage Example
/// ```rust,no_run
/// use dialogue_core::{DialogueEvent, DialogueResult, JsonCodec};
/// use dialogue_publisher::EventPublisher;
/// use serde_json::json;
///
/// # async fn run() -> DialogueResult<()> {
/// let mut publisher = EventPublisher::new("127.0.0.1:9100", JsonCodec::<DialogueEvent>::new());
/// publisher.connect().await?;
/// publisher.publish(&DialogueEvent::new("a", "orders", json!({"qty": 1}))).await?;
/// publisher.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct EventPublisher<C: EventCodec> {
    address: String,
    codec: C,
    config: PublisherConfig,
    session: Option<FrameSession<TcpTransport>>,
}

impl<C: EventCodec> EventPublisher<C> {
    pub fn new(address: impl Into<String>, codec: C) -> Self {
        Self::with_config(address, codec, PublisherConfig::default())
    }

    pub fn with_config(address: impl Into<String>, codec: C, config: PublisherConfig) -> Self {
        Self {
            address: address.into(),
            codec,
            config,
            session: None,
        }
    }

    /// Connect and send SETUP
    ///
    /// Does nothing if already connected.
    ///
    /// # Errors
    /// - `InvalidAddress` for a malformed or unresolvable address
    /// - `Timeout` if the connection is not established in time
    /// - `Connection` if the subscriber refuses or drops the connection
    pub async fn connect(&mut self) -> DialogueResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        let address = ListenAddress::parse(&self.address)?;
        let mut settings = TcpSettings::resolve(&address).await?;
        settings.timeout = self.config.connect_timeout;

        let mut session = FrameSession::new(TcpTransport::new(settings))
            .with_max_frame_length(self.config.max_frame_length);
        session.open().await?;
        session
            .transport_mut()
            .set_timeout(self.config.write_timeout)
            .await?;
        session.send(&Frame::setup()).await?;

        log::debug!("Publisher connected to {}", address);
        self.session = Some(session);
        Ok(())
    }

    /// Encode and send one event
    ///
    /// Returns once the frame is written; the subscriber's handling of the
    /// event is never awaited.
    pub async fn publish(&mut self, event: &C::Event) -> DialogueResult<()> {
        let text = self.codec.encode(event)?;
        self.publish_raw(text.into_bytes()).await
    }

    /// Send an already encoded payload as a fire-and-forget frame
    ///
    /// # Errors
    /// `FrameInvalid` if the payload exceeds `max_frame_length`
    pub async fn publish_raw(&mut self, payload: impl Into<Bytes>) -> DialogueResult<()> {
        let payload = payload.into();
        if payload.len() > self.config.max_frame_length as usize {
            return Err(DialogueError::FrameInvalid(format!(
                "payload of {} bytes exceeds limit of {}",
                payload.len(),
                self.config.max_frame_length
            )));
        }
        self.send_frame(&Frame::fire_and_forget(payload)).await
    }

    /// Send an arbitrary frame
    ///
    /// A failed write drops the session; call `connect` again to resume.
    pub async fn send_frame(&mut self, frame: &Frame) -> DialogueResult<()> {
        let session = self.session.as_mut().ok_or(DialogueError::NotConnected)?;
        let sent = session.send(frame).await;
        if let Err(e) = sent {
            log::warn!("Publisher to {} lost its session: {}", self.address, e);
            self.session = None;
            return Err(e);
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|session| !session.is_closed())
    }

    /// Close the session
    pub async fn close(&mut self) -> DialogueResult<()> {
        if let Some(mut session) = self.session.take() {
            session.close().await?;
        }
        Ok(())
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::{DialogueEvent, JsonCodec};
    use dialogue_session::FrameType;
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn accept_session(listener: &TcpListener) -> FrameSession<TcpTransport> {
        let (stream, _) = listener.accept().await.unwrap();
        FrameSession::accepted(TcpTransport::from_connected_stream(stream, None).unwrap())
    }

    #[tokio::test]
    async fn test_connect_sends_setup_then_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let mut publisher = EventPublisher::new(address, JsonCodec::<DialogueEvent>::new());

        let (mut server, connected) = tokio::join!(accept_session(&listener), publisher.connect());
        connected.unwrap();
        assert!(publisher.is_connected());

        let event = DialogueEvent::new("a", "orders", json!({"qty": 1}));
        publisher.publish(&event).await.unwrap();
        publisher.close().await.unwrap();
        assert!(!publisher.is_connected());

        let setup = server.receive().await.unwrap().unwrap();
        assert_eq!(setup.frame_type(), FrameType::Setup);

        let message = server.receive().await.unwrap().unwrap();
        assert_eq!(message.frame_type(), FrameType::FireAndForget);
        let received: DialogueEvent = serde_json::from_str(message.data_utf8().unwrap()).unwrap();
        assert_eq!(received, event);

        assert!(server.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_before_connect() {
        let mut publisher =
            EventPublisher::new("127.0.0.1:9100", JsonCodec::<DialogueEvent>::new());
        let event = DialogueEvent::new("a", "orders", json!(null));
        assert!(matches!(publisher.publish(&event).await, Err(DialogueError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let address = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().to_string()
        };
        let mut publisher = EventPublisher::new(address, JsonCodec::<DialogueEvent>::new());
        assert!(matches!(publisher.connect().await, Err(DialogueError::Connection(_))));
        assert!(!publisher.is_connected());
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_address() {
        let mut publisher = EventPublisher::new("no-port", JsonCodec::<DialogueEvent>::new());
        assert!(matches!(publisher.connect().await, Err(DialogueError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_oversized_payload_is_not_sent() {
        let config = PublisherConfig::default().with_max_frame_length(4);
        let codec = JsonCodec::<DialogueEvent>::new();
        let mut publisher = EventPublisher::with_config("127.0.0.1:9100", codec, config);
        assert!(matches!(
            publisher.publish_raw(&b"too long"[..]).await,
            Err(DialogueError::FrameInvalid(_))
        ));
    }
}
