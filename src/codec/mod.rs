//! Codec module - payload serialization.
//!
//! - [`MsgPackCodec`] - MessagePack for host method arguments and replies
//! - [`ProtoMessage`] - protobuf capability for carried RPC messages
//!
//! Codecs are marker structs with static methods or small traits rather
//! than trait objects, so the codec is selected at compile time.

mod msgpack;
mod proto;

pub use msgpack::MsgPackCodec;
pub use proto::{ProjectScoped, ProtoMessage};
