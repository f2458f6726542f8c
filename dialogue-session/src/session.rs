//! Frame session over a transport

use crate::frame::{DEFAULT_MAX_FRAME_LENGTH, FRAME_HEADER_LENGTH, Frame, FrameHeader};
use dialogue_core::{DialogueError, DialogueResult};
use dialogue_transport::{StreamAccessor, TransportLayer};

/// Frame session
///
/// Reads and writes whole frames on top of a `StreamAccessor`. A publisher
/// creates the session with `new` and calls `open`; a listener wraps an
/// accepted stream with `accepted`.
#[derive(Debug)]
pub struct FrameSession<T: StreamAccessor> {
    transport: T,
    max_frame_length: u32,
    closed: bool,
}

impl<T: StreamAccessor> FrameSession<T> {
    /// Create a closed session; call `open` before use
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            closed: true,
        }
    }

    /// Create a session on a transport that is already connected
    pub fn accepted(transport: T) -> Self {
        Self {
            transport,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            closed: false,
        }
    }

    /// Limit the payload size accepted by `receive`
    pub fn with_max_frame_length(mut self, max_frame_length: u32) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Send one frame and flush it
    pub async fn send(&mut self, frame: &Frame) -> DialogueResult<()> {
        if self.closed {
            return Err(DialogueError::NotConnected);
        }

        let encoded = frame.encode()?;
        self.transport.write_all(&encoded).await?;
        self.transport.flush().await?;
        Ok(())
    }

    /// Receive the next frame
    ///
    /// # Returns
    /// `Ok(None)` when the peer closed the stream cleanly between frames
    ///
    /// # Errors
    /// - `FrameInvalid` for a bad header or a payload over the size limit
    /// - `Connection(UnexpectedEof)` when the stream ends inside a frame
    pub async fn receive(&mut self) -> DialogueResult<Option<Frame>> {
        if self.closed {
            return Err(DialogueError::NotConnected);
        }

        let mut header_bytes = [0u8; FRAME_HEADER_LENGTH];
        let n = self.transport.read(&mut header_bytes).await?;
        if n == 0 {
            self.closed = true;
            return Ok(None);
        }
        self.transport.read_exact(&mut header_bytes[n..]).await?;

        let header = FrameHeader::decode(&header_bytes)?;
        if header.payload_length() > self.max_frame_length {
            return Err(DialogueError::FrameInvalid(format!(
                "frame payload of {} bytes exceeds limit of {}",
                header.payload_length(),
                self.max_frame_length
            )));
        }

        let mut data = vec![0u8; header.payload_length() as usize];
        self.transport.read_exact(&mut data).await?;
        Ok(Some(Frame::new(header.frame_type(), data)))
    }

    /// Check if session is closed
    pub fn is_closed(&self) -> bool {
        self.closed || self.transport.is_closed()
    }

    /// Close the session and its transport
    pub async fn close(&mut self) -> DialogueResult<()> {
        if !self.closed {
            self.transport.close().await?;
            self.closed = true;
        }
        Ok(())
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: TransportLayer> FrameSession<T> {
    /// Open the transport and mark the session usable
    pub async fn open(&mut self) -> DialogueResult<()> {
        self.transport.open().await?;
        self.closed = false;
        Ok(())
    }
}
