//! RPC bridge - one outbound call per inbound frame.
//!
//! The bridge unframes the host request, injects the project identifier,
//! starts the call through a [`GrpcTransport`], and turns the resulting
//! events into output frames. The whole exchange runs under a single
//! deadline.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use badge_relay::badge::{GenerateBadgeRequest, GenerateBadgeResponse, GENERATE_BADGE};
//! use badge_relay::bridge::RpcBridge;
//! use badge_relay::transport::HttpTransport;
//!
//! let bridge = RpcBridge::new(Arc::new(HttpTransport::new()?), endpoint, project_id, timeout);
//! let response = bridge
//!     .invoke_streaming::<GenerateBadgeRequest, GenerateBadgeResponse>(&GENERATE_BADGE, &frame)
//!     .await?;
//! ```

mod state;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::codec::{ProjectScoped, ProtoMessage};
use crate::error::{RelayError, Result};
use crate::protocol::{decode_frame, Metadata};
use crate::relay::relay_with_timeout;
use crate::transport::{CallEvent, CallEvents, GrpcTransport, MethodDescriptor};

pub use state::{CallPhase, CallState, StreamedResponse};

/// Bridges host frames to remote calls.
#[derive(Clone)]
pub struct RpcBridge {
    transport: Arc<dyn GrpcTransport>,
    endpoint: String,
    project_id: String,
    timeout: Duration,
}

impl RpcBridge {
    /// Create a bridge.
    pub fn new(
        transport: Arc<dyn GrpcTransport>,
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            project_id: project_id.into(),
            timeout,
        }
    }

    /// Remote endpoint address.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Deadline applied to each exchange.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a call to completion and return every frame it produced.
    ///
    /// Fails with `InvalidFrame` before any network activity if `frame` is
    /// malformed.
    pub async fn invoke_streaming<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        frame: &[u8],
    ) -> Result<StreamedResponse>
    where
        Req: ProtoMessage + ProjectScoped,
        Resp: ProtoMessage,
    {
        let request = self.prepare_request::<Req>(frame)?;
        relay_with_timeout(self.timeout, self.call_streaming::<Resp>(method, request)).await
    }

    /// Run a call until its first message and return that message's frame.
    ///
    /// Anything after the first message is ignored.
    pub async fn invoke_unary<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        frame: &[u8],
    ) -> Result<Bytes>
    where
        Req: ProtoMessage + ProjectScoped,
        Resp: ProtoMessage,
    {
        let request = self.prepare_request::<Req>(frame)?;
        relay_with_timeout(self.timeout, self.call_unary::<Resp>(method, request)).await
    }

    /// Unframe, decode, stamp the project id and re-serialize.
    fn prepare_request<Req>(&self, frame: &[u8]) -> Result<Bytes>
    where
        Req: ProtoMessage + ProjectScoped,
    {
        let payload = decode_frame(frame)?;
        let mut request = Req::deserialize_from_bytes(payload)?;
        request.set_project_id(&self.project_id);
        Ok(request.serialize_to_bytes())
    }

    async fn start_call(
        &self,
        method: &MethodDescriptor,
        request: Bytes,
    ) -> Result<(CallState, CallEvents)> {
        let mut state = CallState::new();
        state.transition(CallPhase::Sending);
        tracing::debug!(method = %method.path(), endpoint = %self.endpoint, "Invoking remote call");

        let events = self
            .transport
            .start(method, &self.endpoint, &Metadata::new(), request)
            .await?;

        state.transition(CallPhase::AwaitingFirstEvent);
        Ok((state, events))
    }

    async fn call_streaming<Resp: ProtoMessage>(
        &self,
        method: &MethodDescriptor,
        request: Bytes,
    ) -> Result<StreamedResponse> {
        let (mut state, mut events) = self.start_call(method, request).await?;

        while let Some(event) = events.recv().await {
            match event {
                CallEvent::Headers(metadata) => state.on_headers(metadata)?,
                CallEvent::Message(bytes) => {
                    state.on_message::<Resp>(&bytes)?;
                }
                CallEvent::End(status) => return state.finish(status),
            }
        }

        Err(closed_without_status())
    }

    async fn call_unary<Resp: ProtoMessage>(
        &self,
        method: &MethodDescriptor,
        request: Bytes,
    ) -> Result<Bytes> {
        let (mut state, mut events) = self.start_call(method, request).await?;

        while let Some(event) = events.recv().await {
            match event {
                CallEvent::Headers(metadata) => state.on_headers(metadata)?,
                CallEvent::Message(bytes) => return state.on_message::<Resp>(&bytes),
                CallEvent::End(status) => {
                    state.finish(status)?;
                    return Err(RelayError::RemoteCallFailed(
                        "call completed without a response message".to_string(),
                    ));
                }
            }
        }

        Err(closed_without_status())
    }
}

fn closed_without_status() -> RelayError {
    RelayError::RemoteCallFailed("event stream closed without a status".to_string())
}
