//! Per-invocation call state.
//!
//! Owned by exactly one bridge invocation. Collects output frames in arrival
//! order and keeps leading metadata apart from the trailer.

use bytes::Bytes;

use crate::codec::ProtoMessage;
use crate::error::{RelayError, Result};
use crate::protocol::{encode_frame, FrameType, Metadata, GRPC_STATUS};
use crate::transport::CallStatus;

/// Lifecycle of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// Nothing sent yet.
    Idle,
    /// Request is being written.
    Sending,
    /// Request sent, no event observed yet.
    AwaitingFirstEvent,
    /// At least one event observed.
    StreamingEvents,
    /// Terminal status observed.
    Terminated,
}

/// Everything a finished call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedResponse {
    /// Header and message frames in arrival order.
    pub frames: Vec<Bytes>,
    /// All leading metadata merged into one record.
    pub headers: Metadata,
    /// Trailing metadata, if the remote sent any.
    pub trailers: Option<Metadata>,
    /// Terminal status.
    pub status: CallStatus,
}

impl StreamedResponse {
    /// Take the output frames.
    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames
    }
}

/// Mutable state for one call.
#[derive(Debug)]
pub struct CallState {
    phase: CallPhase,
    frames: Vec<Bytes>,
    leading: Vec<Metadata>,
    headers: Option<Metadata>,
    trailers: Option<Metadata>,
}

impl CallState {
    /// Create state for a call that has not started.
    pub fn new() -> Self {
        Self {
            phase: CallPhase::Idle,
            frames: Vec::new(),
            leading: Vec::new(),
            headers: None,
            trailers: None,
        }
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    /// Output frames collected so far.
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    pub(crate) fn transition(&mut self, next: CallPhase) {
        tracing::trace!(from = ?self.phase, to = ?next, "Call phase");
        self.phase = next;
    }

    fn observe_event(&mut self) {
        if self.phase == CallPhase::AwaitingFirstEvent {
            self.transition(CallPhase::StreamingEvents);
        }
    }

    /// Record a metadata event and append its header frame.
    ///
    /// Metadata carrying `grpc-status` is the trailer; seeing it folds all
    /// earlier leading metadata into one record.
    pub fn on_headers(&mut self, metadata: Metadata) -> Result<()> {
        self.observe_event();
        let frame = encode_frame(&metadata.to_ascii()?, FrameType::Header)?;
        self.frames.push(frame);

        if metadata.contains(GRPC_STATUS) {
            tracing::trace!(names = metadata.len(), "Trailing metadata");
            self.headers = Some(self.consolidate_leading());
            self.trailers = Some(metadata);
        } else {
            tracing::trace!(names = metadata.len(), "Leading metadata");
            self.leading.push(metadata);
        }
        Ok(())
    }

    /// Record a message event and append its message frame.
    ///
    /// The message must decode as `M`. The received bytes are framed as
    /// they arrived, so fields `M` does not know survive. Returns the
    /// appended frame.
    pub fn on_message<M: ProtoMessage>(&mut self, bytes: &[u8]) -> Result<Bytes> {
        self.observe_event();
        M::deserialize_from_bytes(bytes)?;
        let frame = encode_frame(bytes, FrameType::Message)?;
        tracing::trace!(len = frame.len(), "Message frame");
        self.frames.push(frame.clone());
        Ok(frame)
    }

    /// Apply the terminal status.
    pub fn finish(mut self, status: CallStatus) -> Result<StreamedResponse> {
        self.transition(CallPhase::Terminated);
        tracing::debug!(code = ?status.code, message = ?status.message, "Call ended");

        if !status.is_success() {
            let message = status.message.unwrap_or_default();
            return Err(RelayError::RemoteCallFailed(message));
        }

        let headers = match self.headers.take() {
            Some(headers) => {
                // Leading metadata observed after the trailer
                let mut headers = headers;
                for late in self.leading.drain(..) {
                    headers.merge(&late);
                }
                headers
            }
            None => self.consolidate_leading(),
        };

        Ok(StreamedResponse {
            frames: self.frames,
            headers,
            trailers: self.trailers,
            status,
        })
    }

    fn consolidate_leading(&mut self) -> Metadata {
        let mut merged = Metadata::new();
        for metadata in self.leading.drain(..) {
            merged.merge(&metadata);
        }
        merged
    }
}

impl Default for CallState {
    fn default() -> Self {
        Self::new()
    }
}
