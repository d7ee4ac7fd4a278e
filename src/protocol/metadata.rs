//! Ordered, multi-valued header metadata and its ASCII wire form.
//!
//! Header frames carry metadata as text, one line per value:
//! ```text
//! <name>: <value>\r\n
//! ```
//!
//! # Example
//!
//! ```
//! use badge_relay::protocol::Metadata;
//!
//! let mut md = Metadata::new();
//! md.append("a", "1");
//! md.append("b", "x");
//! md.append("a", "2");
//!
//! assert_eq!(md.serialize(), "a: 1\r\na: 2\r\nb: x\r\n");
//! ```

use bytes::Bytes;
use reqwest::header::HeaderMap;

use crate::error::{RelayError, Result};

/// Metadata key carrying the terminal gRPC status code.
pub const GRPC_STATUS: &str = "grpc-status";

/// Metadata key carrying the terminal gRPC status message.
pub const GRPC_MESSAGE: &str = "grpc-message";

/// Ordered mapping from header name to its values.
///
/// Names keep the order of their first insertion and are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, Vec<String>)>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single value under `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Append several values under `name`, keeping their order.
    pub fn append_all<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.append(name, value);
        }
    }

    /// Get all values for `name` (empty if absent).
    pub fn get(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Get the first value for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).first().map(String::as_str)
    }

    /// Check whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Iterate names with their values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no names are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every entry of `other` to this record.
    pub fn merge(&mut self, other: &Metadata) {
        for (name, values) in other.iter() {
            self.append_all(name, values.iter().cloned());
        }
    }

    /// Serialize to the `name: value\r\n` text form.
    ///
    /// Duplicate names produce duplicate lines; nothing is coalesced.
    pub fn serialize(&self) -> String {
        let mut result = String::new();
        for (name, values) in self.iter() {
            for value in values {
                result.push_str(name);
                result.push_str(": ");
                result.push_str(value);
                result.push_str("\r\n");
            }
        }
        result
    }

    /// Serialize and validate as ASCII, ready for a header frame.
    pub fn to_ascii(&self) -> Result<Bytes> {
        encode_ascii(&self.serialize())
    }

    /// Parse the text form produced by [`Metadata::serialize`].
    ///
    /// Accepts CRLF or LF line endings. Names and values are trimmed and
    /// blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut md = Metadata::new();
        for line in text.split('\n') {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                RelayError::Protocol(format!("metadata line without ':' separator: {:?}", line))
            })?;
            md.append(name.trim(), value.trim());
        }
        Ok(md)
    }

    /// Build metadata from HTTP response headers.
    ///
    /// Values that are not valid visible ASCII are skipped.
    pub fn from_http_headers(headers: &HeaderMap) -> Self {
        let mut md = Metadata::new();
        for (name, value) in headers {
            match value.to_str() {
                Ok(v) => md.append(name.as_str(), v),
                Err(_) => {
                    tracing::warn!(header = %name, "Skipping non-ASCII response header value");
                }
            }
        }
        md
    }
}

#[inline]
fn is_allowed_control_char(c: char) -> bool {
    c == '\t' || c == '\n' || c == '\r'
}

#[inline]
fn is_valid_header_ascii(c: char) -> bool {
    is_allowed_control_char(c) || (' '..='~').contains(&c)
}

/// Encode text as ASCII bytes, rejecting anything outside tab, LF, CR and
/// printable ASCII (0x20-0x7E).
///
/// Fails on the first offending character and returns nothing partial.
pub fn encode_ascii(text: &str) -> Result<Bytes> {
    let mut encoded = Vec::with_capacity(text.len());
    for (position, character) in text.chars().enumerate() {
        if !is_valid_header_ascii(character) {
            return Err(RelayError::InvalidAscii {
                character,
                position,
            });
        }
        encoded.push(character as u8);
    }
    Ok(Bytes::from(encoded))
}
