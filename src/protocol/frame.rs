//! Frame codec for the length-prefixed envelope.
//!
//! Implements the 5-byte header format shared by the host channel and
//! gRPC-Web bodies:
//! ```text
//! ┌────────┬──────────┬─────────────┐
//! │ Type   │ Length   │ Payload     │
//! │ 1 byte │ 4 bytes  │ Length bytes│
//! │        │ uint32 BE│             │
//! └────────┴──────────┴─────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use badge_relay::protocol::{decode_frame, encode_frame, FrameType};
//!
//! let frame = encode_frame(b"hello", FrameType::Message).unwrap();
//! assert_eq!(frame.len(), 5 + 5);
//! assert_eq!(decode_frame(&frame).unwrap(), b"hello");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{RelayError, Result};

/// Header size in bytes (type byte + 4-byte length).
pub const HEADER_SIZE: usize = 5;

/// Type byte for message payloads.
pub const MESSAGE_TYPE: u8 = 0x00;

/// Type byte for header-metadata payloads (MSB set).
pub const HEADER_TYPE: u8 = 0x80;

/// Frame type discriminator (byte 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Serialized message payload (0x00).
    Message,
    /// ASCII header-metadata payload (0x80).
    Header,
    /// Any other discriminator value.
    Reserved(u8),
}

impl FrameType {
    /// Get the wire byte for this type.
    #[inline]
    pub fn as_byte(self) -> u8 {
        match self {
            FrameType::Message => MESSAGE_TYPE,
            FrameType::Header => HEADER_TYPE,
            FrameType::Reserved(b) => b,
        }
    }
}

impl From<u8> for FrameType {
    fn from(byte: u8) -> Self {
        match byte {
            MESSAGE_TYPE => FrameType::Message,
            HEADER_TYPE => FrameType::Header,
            other => FrameType::Reserved(other),
        }
    }
}

impl From<FrameType> for u8 {
    fn from(frame_type: FrameType) -> Self {
        frame_type.as_byte()
    }
}

/// Read the big-endian payload length from an encoded header.
///
/// Returns `None` if the buffer is shorter than `HEADER_SIZE`.
#[inline]
pub(crate) fn read_length(buf: &[u8]) -> Option<u32> {
    if buf.len() < HEADER_SIZE {
        return None;
    }
    Some(u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]))
}

/// Unframe a complete envelope and return its payload.
///
/// Fails if the buffer is shorter than 5 bytes or if the declared length
/// does not equal the number of bytes that follow the header.
pub fn decode_frame(frame: &[u8]) -> Result<&[u8]> {
    let declared = match read_length(frame) {
        Some(len) => len,
        None => {
            tracing::warn!("Frame is too short to contain a valid message");
            return Err(RelayError::InvalidFrame(format!(
                "frame of {} bytes is shorter than the {}-byte header",
                frame.len(),
                HEADER_SIZE
            )));
        }
    };

    let actual = frame.len() - HEADER_SIZE;
    if actual as u64 != u64::from(declared) {
        tracing::warn!(
            declared,
            actual,
            "Frame length doesn't match the expected message length"
        );
        return Err(RelayError::InvalidFrame(format!(
            "declared length {} but {} payload bytes present",
            declared, actual
        )));
    }

    Ok(&frame[HEADER_SIZE..])
}

/// Frame a payload with the given type byte.
///
/// Fails only if the payload length does not fit in 32 bits.
pub fn encode_frame(payload: &[u8], frame_type: FrameType) -> Result<Bytes> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        RelayError::InvalidFrame(format!(
            "payload of {} bytes exceeds the 32-bit length field",
            payload.len()
        ))
    })?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_u8(frame_type.as_byte());
    buf.put_u32(len);
    buf.extend_from_slice(payload);
    Ok(buf.freeze())
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Type discriminator.
    pub frame_type: FrameType,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(frame_type: FrameType, payload: Bytes) -> Self {
        Self {
            frame_type,
            payload,
        }
    }

    /// Create a message frame.
    pub fn message(payload: Bytes) -> Self {
        Self::new(FrameType::Message, payload)
    }

    /// Create a header-metadata frame.
    pub fn header(payload: Bytes) -> Self {
        Self::new(FrameType::Header, payload)
    }

    /// Decode a complete envelope without copying the payload.
    pub fn decode(frame: Bytes) -> Result<Self> {
        let payload_len = decode_frame(&frame)?.len();
        let frame_type = FrameType::from(frame[0]);
        let payload = frame.slice(HEADER_SIZE..HEADER_SIZE + payload_len);
        Ok(Self::new(frame_type, payload))
    }

    /// Encode this frame to a contiguous buffer.
    pub fn encode(&self) -> Result<Bytes> {
        encode_frame(&self.payload, self.frame_type)
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Check if this is a message frame.
    #[inline]
    pub fn is_message(&self) -> bool {
        self.frame_type == FrameType::Message
    }

    /// Check if this is a header-metadata frame.
    #[inline]
    pub fn is_header(&self) -> bool {
        self.frame_type == FrameType::Header
    }
}
