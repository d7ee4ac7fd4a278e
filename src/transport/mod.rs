//! Transport module - the seam between the bridge and the remote endpoint.
//!
//! A transport starts one call and hands back an ordered stream of
//! [`CallEvent`]s: headers, messages, and finally the terminal status.
//! Events for a call are delivered in the order the remote produced them.

mod grpc_web;
#[cfg(any(test, feature = "testing"))]
mod mock;
mod status;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::protocol::Metadata;

pub use grpc_web::{HttpTransport, EVENT_CHANNEL_CAPACITY, GRPC_WEB_CONTENT_TYPE};
#[cfg(any(test, feature = "testing"))]
pub use mock::{MockTransport, RecordedCall};
pub use status::{CallStatus, Code};

/// A single event observed on a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// Leading metadata, or trailing metadata when it carries `grpc-status`.
    Headers(Metadata),
    /// One serialized response message.
    Message(Bytes),
    /// Terminal status. No events follow.
    End(CallStatus),
}

/// Ordered receiver of call events.
pub type CallEvents = mpsc::Receiver<CallEvent>;

/// Fully-qualified RPC method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Service name, e.g. `lavanet.lava.pairing.BadgeGenerator`.
    pub service: &'static str,
    /// Method name, e.g. `GenerateBadge`.
    pub method: &'static str,
}

impl MethodDescriptor {
    /// Create a method descriptor.
    pub const fn new(service: &'static str, method: &'static str) -> Self {
        Self { service, method }
    }

    /// HTTP path for this method (`/service/method`).
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

/// Starts remote calls.
///
/// Implementations are shared across invocations and must not keep
/// per-call state.
#[async_trait]
pub trait GrpcTransport: Send + Sync {
    /// Start a call and send `request` (already serialized, unframed).
    ///
    /// The send side is closed once the request is written. Transport
    /// failures after the call has started arrive as an [`CallEvent::End`]
    /// carrying the failure text.
    async fn start(
        &self,
        method: &MethodDescriptor,
        host: &str,
        metadata: &Metadata,
        request: Bytes,
    ) -> Result<CallEvents>;
}
