//! MsgPack codec for host method arguments and replies, using `rmp-serde`.
//!
//! **Always use `to_vec_named`, never `to_vec`.** The host decodes structs
//! as maps keyed by field name; positional arrays are not understood.

use crate::error::Result;

/// MessagePack codec for host-facing values.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value with structs written as maps.
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode a value. Accepts both map and array struct encodings.
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
