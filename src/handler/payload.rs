//! Host-facing argument and reply shapes.
//!
//! The host serializes byte buffers in several ways depending on how the
//! caller built them: a native binary, a plain array of numbers, or an
//! array-like object keyed by index. [`HostBytes`] accepts all three.

use std::fmt;

use bytes::Bytes;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

/// A byte buffer as sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostBytes(pub Vec<u8>);

impl HostBytes {
    /// Get the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Into the owned byte vector.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl<'de> Deserialize<'de> for HostBytes {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(HostBytesVisitor)
    }
}

struct HostBytesVisitor;

impl<'de> Visitor<'de> for HostBytesVisitor {
    type Value = HostBytes;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a binary, an array of bytes, or an index-keyed object of bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<HostBytes, E> {
        Ok(HostBytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<HostBytes, E> {
        Ok(HostBytes(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<HostBytes, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            out.push(byte);
        }
        Ok(HostBytes(out))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<HostBytes, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries: Vec<(u64, u8)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((IndexKey(index), byte)) = map.next_entry::<IndexKey, u8>()? {
            entries.push((index, byte));
        }
        entries.sort_by_key(|(index, _)| *index);
        Ok(HostBytes(entries.into_iter().map(|(_, byte)| byte).collect()))
    }
}

/// Object key of an array-like object: an integer or a numeric string.
struct IndexKey(u64);

impl<'de> Deserialize<'de> for IndexKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IndexKeyVisitor;

        impl<'de> Visitor<'de> for IndexKeyVisitor {
            type Value = IndexKey;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative integer index")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<IndexKey, E> {
                Ok(IndexKey(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<IndexKey, E> {
                u64::try_from(v)
                    .map(IndexKey)
                    .map_err(|_| E::custom(format!("negative index {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<IndexKey, E> {
                v.parse::<u64>()
                    .map(IndexKey)
                    .map_err(|_| E::custom(format!("non-numeric index {:?}", v)))
            }
        }

        deserializer.deserialize_any(IndexKeyVisitor)
    }
}

/// Value returned to the host by a method handler.
///
/// Buffers serialize as arrays of numbers, which every host runtime can
/// turn back into a byte array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HandlerReply {
    /// Ordered output frames.
    Frames(Vec<Vec<u8>>),
    /// A single output frame.
    Frame(Vec<u8>),
    /// A failure reported as a value.
    Error {
        /// Human-readable failure message.
        error: String,
    },
}

impl HandlerReply {
    /// Reply with a frame sequence.
    pub fn frames(frames: Vec<Bytes>) -> Self {
        HandlerReply::Frames(frames.into_iter().map(|f| f.to_vec()).collect())
    }

    /// Reply with one frame.
    pub fn frame(frame: Bytes) -> Self {
        HandlerReply::Frame(frame.to_vec())
    }

    /// Reply with an error value.
    pub fn error(message: impl Into<String>) -> Self {
        HandlerReply::Error {
            error: message.into(),
        }
    }

    /// Check if this reply reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, HandlerReply::Error { .. })
    }
}
