//! Frame encoding
//!
//! ```text
//! +---------+------------+----------------+-----------------+
//! | version | frame type | payload length | payload ...     |
//! |  u16 BE |   u16 BE   |     u32 BE     | length bytes    |
//! +---------+------------+----------------+-----------------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use dialogue_core::{DialogueError, DialogueResult};

/// Frame header length
pub const FRAME_HEADER_LENGTH: usize = 8;

/// The only protocol version this stack speaks
pub const PROTOCOL_VERSION: u16 = 1;

/// Default upper bound for a frame payload (1 MiB)
pub const DEFAULT_MAX_FRAME_LENGTH: u32 = 1024 * 1024;

/// Frame type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Sent once by a publisher after connecting
    Setup,
    /// Liveness probe, no payload
    KeepAlive,
    /// One-way message carrying an encoded event
    FireAndForget,
    /// A code this stack does not understand
    Other(u16),
}

impl FrameType {
    pub fn code(self) -> u16 {
        match self {
            FrameType::Setup => 0x01,
            FrameType::KeepAlive => 0x03,
            FrameType::FireAndForget => 0x05,
            FrameType::Other(code) => code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            0x01 => FrameType::Setup,
            0x03 => FrameType::KeepAlive,
            0x05 => FrameType::FireAndForget,
            other => FrameType::Other(other),
        }
    }
}

/// Frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    frame_type: FrameType,
    length: u32,
}

impl FrameHeader {
    pub fn new(frame_type: FrameType, length: u32) -> Self {
        Self { frame_type, length }
    }

    /// Encode the header into `dst`
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(FRAME_HEADER_LENGTH);
        dst.put_u16(PROTOCOL_VERSION);
        dst.put_u16(self.frame_type.code());
        dst.put_u32(self.length);
    }

    /// Decode a header
    ///
    /// # Errors
    /// Returns `FrameInvalid` if fewer than `FRAME_HEADER_LENGTH` bytes are
    /// given or the version is not `PROTOCOL_VERSION`.
    pub fn decode(mut data: &[u8]) -> DialogueResult<Self> {
        if data.len() < FRAME_HEADER_LENGTH {
            return Err(DialogueError::FrameInvalid(format!(
                "frame header too short: expected {}, got {}",
                FRAME_HEADER_LENGTH,
                data.len()
            )));
        }

        let version = data.get_u16();
        if version != PROTOCOL_VERSION {
            return Err(DialogueError::FrameInvalid(format!(
                "frame version was {}, this stack is only compatible with version {}",
                version, PROTOCOL_VERSION
            )));
        }

        let frame_type = FrameType::from_code(data.get_u16());
        let length = data.get_u32();
        Ok(Self { frame_type, length })
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn payload_length(&self) -> u32 {
        self.length
    }
}

/// A complete frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    frame_type: FrameType,
    data: Bytes,
}

impl Frame {
    pub fn new(frame_type: FrameType, data: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            data: data.into(),
        }
    }

    pub fn setup() -> Self {
        Self::new(FrameType::Setup, Bytes::new())
    }

    pub fn keep_alive() -> Self {
        Self::new(FrameType::KeepAlive, Bytes::new())
    }

    pub fn fire_and_forget(data: impl Into<Bytes>) -> Self {
        Self::new(FrameType::FireAndForget, data)
    }

    /// Header describing this frame
    ///
    /// # Errors
    /// Returns `FrameInvalid` if the payload does not fit in a `u32` length
    pub fn header(&self) -> DialogueResult<FrameHeader> {
        let length = u32::try_from(self.data.len()).map_err(|_| {
            let len = self.data.len();
            DialogueError::FrameInvalid(format!("payload of {} bytes is too large", len))
        })?;
        Ok(FrameHeader::new(self.frame_type, length))
    }

    /// Encode header and payload
    pub fn encode(&self) -> DialogueResult<Bytes> {
        let header = self.header()?;
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LENGTH + self.data.len());
        header.encode_into(&mut buf);
        buf.put_slice(&self.data);
        Ok(buf.freeze())
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload as UTF-8 text
    pub fn data_utf8(&self) -> DialogueResult<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|e| DialogueError::InvalidPayload(format!("payload is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_and_forget_layout() {
        let encoded = Frame::fire_and_forget(&b"{}"[..]).encode().unwrap();
        assert_eq!(&encoded[..], &[0x00, 0x01, 0x00, 0x05, 0x00, 0x00, 0x00, 0x02, b'{', b'}']);

        let header = FrameHeader::decode(&encoded).unwrap();
        assert_eq!(header.frame_type(), FrameType::FireAndForget);
        assert_eq!(header.payload_length(), 2);
    }

    #[test]
    fn test_unknown_frame_type_is_preserved() {
        let bytes = [0x00, 0x01, 0x00, 0x2a, 0x00, 0x00, 0x00, 0x00];
        let header = FrameHeader::decode(&bytes).unwrap();
        assert_eq!(header.frame_type(), FrameType::Other(0x2a));
        assert_eq!(header.frame_type().code(), 0x2a);
    }

    #[test]
    fn test_header_rejects_wrong_version() {
        let result = FrameHeader::decode(&[0x00, 0x02, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(result, Err(DialogueError::FrameInvalid(_))));
    }

    #[test]
    fn test_header_rejects_short_input() {
        assert!(matches!(
            FrameHeader::decode(&[0x00, 0x01, 0x00]),
            Err(DialogueError::FrameInvalid(_))
        ));
    }

    #[test]
    fn test_data_utf8() {
        assert_eq!(Frame::fire_and_forget("héllo").data_utf8().unwrap(), "héllo");
        assert!(matches!(
            Frame::fire_and_forget(vec![0xc3, 0x28]).data_utf8(),
            Err(DialogueError::InvalidPayload(_))
        ));
    }
}
