//! TCP transport implementation

use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use dialogue_core::{DialogueError, DialogueResult, ListenAddress};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// TCP transport settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    /// Remote address to connect to (or the peer address of an accepted stream)
    pub address: SocketAddr,
    /// Timeout applied to connect, read and write. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings with a 30 second timeout
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create TCP settings with an explicit timeout
    pub fn with_timeout(address: SocketAddr, timeout: Option<Duration>) -> Self {
        Self { address, timeout }
    }

    /// Resolve a `host:port` address to settings for its first socket address
    ///
    /// # Errors
    /// Returns `Connection` if resolution fails and `InvalidAddress` if the
    /// host resolves to nothing.
    pub async fn resolve(address: &ListenAddress) -> DialogueResult<Self> {
        let resolved = tokio::net::lookup_host((address.host(), address.port()))
            .await?
            .next()
            .ok_or_else(|| {
                DialogueError::InvalidAddress(format!("{} resolved to no addresses", address))
            })?;
        Ok(Self::new(resolved))
    }
}

/// TCP transport layer
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl TcpTransport {
    /// Create a transport that connects on `open()`
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Wrap a stream produced by a listener
    ///
    /// The transport is already open; calling `open()` on it fails.
    pub fn from_connected_stream(
        stream: TcpStream,
        timeout: Option<Duration>,
    ) -> DialogueResult<Self> {
        let peer = stream.peer_addr()?;
        Ok(Self {
            stream: Some(stream),
            settings: TcpSettings::with_timeout(peer, timeout),
            closed: false,
        })
    }

    fn stream_mut(&mut self) -> DialogueResult<&mut TcpStream> {
        self.stream.as_mut().ok_or(DialogueError::NotConnected)
    }
}

#[async_trait]
impl TransportLayer for TcpTransport {
    async fn open(&mut self) -> DialogueResult<()> {
        if !self.closed {
            return Err(DialogueError::InvalidState(
                "TCP transport is already open".to_string(),
            ));
        }

        let connect = TcpStream::connect(self.settings.address);
        let stream = match self.settings.timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| DialogueError::Timeout)??,
            None => connect.await?,
        };
        stream.set_nodelay(true)?;

        self.stream = Some(stream);
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> DialogueResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> DialogueResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| DialogueError::Timeout)
                .and_then(|r| r.map_err(DialogueError::Connection)),
            None => stream.read(buf).await.map_err(DialogueError::Connection),
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(DialogueError::Timeout) => Err(DialogueError::Timeout),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> DialogueResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| DialogueError::Timeout)?
                .map_err(DialogueError::Connection),
            None => stream.write(buf).await.map_err(DialogueError::Connection),
        }
    }

    async fn flush(&mut self) -> DialogueResult<()> {
        self.stream_mut()?.flush().await.map_err(DialogueError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> DialogueResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_tcp_settings() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let settings = TcpSettings::new(addr);
        assert_eq!(settings.address, addr);
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let address = ListenAddress::parse("127.0.0.1:9100").unwrap();
        let settings = TcpSettings::resolve(&address).await.unwrap();
        assert_eq!(settings.address, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_connected_pair_exchanges_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpTransport::new(TcpSettings::new(addr));
        let (accepted, client_result) = tokio::join!(listener.accept(), client.open());
        client_result.unwrap();
        let (stream, _) = accepted.unwrap();
        let mut server = TcpTransport::from_connected_stream(stream, None).unwrap();
        assert!(!server.is_closed());

        client.write_all(b"hello").await.unwrap();
        client.flush().await.unwrap();

        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");

        client.close().await.unwrap();
        assert!(client.is_closed());
        let mut rest = [0u8; 1];
        assert_eq!(server.read(&mut rest).await.unwrap(), 0);
        assert!(server.is_closed());
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (stream, _) = tokio::join!(
            TcpStream::connect(listener.local_addr().unwrap()),
            listener.accept()
        );
        let mut transport = TcpTransport::from_connected_stream(stream.unwrap(), None).unwrap();
        assert!(matches!(transport.open().await, Err(DialogueError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_io_before_open_is_not_connected() {
        let mut transport = TcpTransport::new(TcpSettings::new("127.0.0.1:1".parse().unwrap()));
        let mut buf = [0u8; 1];
        assert!(matches!(transport.read(&mut buf).await, Err(DialogueError::NotConnected)));
    }
}
