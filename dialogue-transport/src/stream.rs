//! Stream accessor trait for the transport layer

use async_trait::async_trait;
use dialogue_core::{DialogueError, DialogueResult};
use std::time::Duration;

/// Byte stream to a remote peer
///
/// The session layer only talks to this trait, so frames can be exercised
/// against in-memory streams in tests.
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Set the read/write timeout. `None` waits indefinitely.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> DialogueResult<()>;

    /// Read available bytes into `buf`
    ///
    /// # Returns
    /// Number of bytes read, or 0 on EOF
    async fn read(&mut self, buf: &mut [u8]) -> DialogueResult<usize>;

    /// Fill `buf` completely
    ///
    /// # Errors
    /// Returns `Connection(UnexpectedEof)` if the stream ends first
    async fn read_exact(&mut self, mut buf: &mut [u8]) -> DialogueResult<()> {
        while !buf.is_empty() {
            let n = self.read(buf).await?;
            if n == 0 {
                return Err(DialogueError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream closed before the expected number of bytes arrived",
                )));
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Write some of `buf`, returning the number of bytes written
    async fn write(&mut self, buf: &[u8]) -> DialogueResult<usize>;

    /// Write all of `buf`
    async fn write_all(&mut self, buf: &[u8]) -> DialogueResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(DialogueError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "stream accepted zero bytes",
                )));
            }
            written += n;
        }
        Ok(())
    }

    async fn flush(&mut self) -> DialogueResult<()>;

    /// Whether the stream has been closed, locally or by the peer
    fn is_closed(&self) -> bool;

    async fn close(&mut self) -> DialogueResult<()>;
}

/// A stream that can establish its own connection
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the underlying connection
    async fn open(&mut self) -> DialogueResult<()>;
}
