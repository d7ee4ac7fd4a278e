//! Error types for badge-relay.

use thiserror::Error;

/// Main error type for all relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Inbound envelope is too short or its length field is wrong.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Header metadata contains a byte outside the allowed ASCII set.
    #[error("Metadata contains invalid ASCII: {character:?} at position {position}")]
    InvalidAscii {
        /// The offending character.
        character: char,
        /// Character index within the serialized metadata.
        position: usize,
    },

    /// Remote call terminated with a non-OK status.
    #[error("Failed fetching a badge from the badge server, message: {0}")]
    RemoteCallFailed(String),

    /// The exchange did not finish before its deadline.
    #[error("Timeout exceeded")]
    TimeoutExceeded,

    /// Host request could not be unframed.
    #[error("invalid data")]
    InvalidData,

    /// Protocol error (truncated body, malformed trailers, oversized frame).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Protobuf decoding error.
    #[error("Protobuf decode error: {0}")]
    ProtoDecode(#[from] prost::DecodeError),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No handler registered under the given method name.
    #[error("Handler not found for method: {0}")]
    HandlerNotFound(String),
}

impl RelayError {
    /// Whether this error is reported to the host as a value rather than thrown.
    ///
    /// Remote failures and timeouts leave the handler as an error reply;
    /// everything else aborts the handler.
    pub fn is_reply_error(&self) -> bool {
        matches!(
            self,
            RelayError::RemoteCallFailed(_) | RelayError::TimeoutExceeded
        )
    }
}

/// Result type alias using RelayError.
pub type Result<T> = std::result::Result<T, RelayError>;
