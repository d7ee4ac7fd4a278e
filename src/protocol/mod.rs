//! Protocol module - framing and header metadata.
//!
//! This module implements the binary envelope used both on the host
//! channel and inside gRPC-Web bodies:
//! - 5-byte header encoding/decoding
//! - Frame buffer for splitting streamed bodies
//! - Ordered metadata with its ASCII serialization

mod frame;
mod frame_buffer;
mod metadata;

pub use frame::{
    decode_frame, encode_frame, Frame, FrameType, HEADER_SIZE, HEADER_TYPE, MESSAGE_TYPE,
};
pub use frame_buffer::{FrameBuffer, DEFAULT_MAX_PAYLOAD_SIZE};
pub use metadata::{encode_ascii, Metadata, GRPC_MESSAGE, GRPC_STATUS};
