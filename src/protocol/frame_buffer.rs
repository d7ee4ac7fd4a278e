//! Frame buffer for splitting streamed bodies into frames.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need at least 5 bytes
//! - `WaitingForPayload`: Header parsed, need N more payload bytes
//!
//! # Example
//!
//! ```
//! use badge_relay::protocol::{encode_frame, FrameBuffer, FrameType};
//!
//! let bytes = encode_frame(b"hello", FrameType::Message).unwrap();
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in chunks from the response body
//! assert!(buffer.push(&bytes[..3]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[3..]).unwrap();
//! assert_eq!(frames[0].payload(), b"hello");
//! ```

use bytes::{Bytes, BytesMut};

use super::frame::{read_length, Frame, FrameType, HEADER_SIZE};
use crate::error::{RelayError, Result};

/// Default maximum payload size (4 MiB, the default gRPC receive limit).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 4 * 1024 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for complete header (need 5 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for payload bytes.
    WaitingForPayload { frame_type: FrameType, remaining: u32 },
}

/// Buffer for accumulating body chunks and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from body reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default payload limit.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with a custom payload limit.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: State::WaitingForHeader,
            max_payload_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// If data is fragmented, partial data is buffered internally for the
    /// next push.
    ///
    /// # Errors
    ///
    /// Returns error if a declared payload exceeds `max_payload_size`.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::WaitingForHeader => {
                let payload_length = match read_length(&self.buffer) {
                    Some(len) => len,
                    None => return Ok(None),
                };

                if payload_length > self.max_payload_size {
                    return Err(RelayError::Protocol(format!(
                        "Payload size {} exceeds maximum {}",
                        payload_length, self.max_payload_size
                    )));
                }

                let frame_type = FrameType::from(self.buffer[0]);
                let _ = self.buffer.split_to(HEADER_SIZE);

                if payload_length == 0 {
                    return Ok(Some(Frame::new(frame_type, Bytes::new())));
                }

                self.state = State::WaitingForPayload {
                    frame_type,
                    remaining: payload_length,
                };
                self.try_extract_one()
            }

            State::WaitingForPayload {
                frame_type,
                remaining,
            } => {
                let remaining = remaining as usize;
                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let payload = self.buffer.split_to(remaining).freeze();
                self.state = State::WaitingForHeader;

                Ok(Some(Frame::new(frame_type, payload)))
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if no partial frame is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && matches!(self.state, State::WaitingForHeader)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
