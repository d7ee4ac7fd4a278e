//! gRPC status codes and terminal call status.

use crate::protocol::{Metadata, GRPC_MESSAGE, GRPC_STATUS};

/// Standard gRPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    /// Map a numeric status to a code. Out-of-range values become `Unknown`.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Code::Ok,
            1 => Code::Cancelled,
            2 => Code::Unknown,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            6 => Code::AlreadyExists,
            7 => Code::PermissionDenied,
            8 => Code::ResourceExhausted,
            9 => Code::FailedPrecondition,
            10 => Code::Aborted,
            11 => Code::OutOfRange,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            15 => Code::DataLoss,
            16 => Code::Unauthenticated,
            _ => Code::Unknown,
        }
    }

    /// Map an HTTP status of a response that carried no gRPC status.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200 => Code::Ok,
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            429 | 502 | 503 | 504 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

/// Terminal status of a remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStatus {
    /// Status code.
    pub code: Code,
    /// Status message, if the remote supplied one.
    pub message: Option<String>,
}

impl CallStatus {
    /// Create a status with a message.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// A successful status with no message.
    pub fn ok() -> Self {
        Self {
            code: Code::Ok,
            message: None,
        }
    }

    /// Read `grpc-status` / `grpc-message` from metadata.
    ///
    /// Returns `None` when no `grpc-status` is present. An unparsable status
    /// value maps to `Unknown`.
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        let raw = metadata.first(GRPC_STATUS)?;
        let code = raw
            .trim()
            .parse::<i32>()
            .map(Code::from_i32)
            .unwrap_or(Code::Unknown);
        Some(Self {
            code,
            message: metadata.first(GRPC_MESSAGE).map(str::to_string),
        })
    }

    /// Whether the call resolves successfully.
    ///
    /// A non-OK status without any message is also treated as success.
    pub fn is_success(&self) -> bool {
        self.code == Code::Ok || self.message.is_none()
    }
}
