//! gRPC-Web transport over HTTP using `reqwest`.
//!
//! One POST per call. The response is turned into an ordered event stream:
//! HTTP headers first, then one event per message frame, then the trailer
//! frame, then the terminal status. A spawned pump task feeds the events
//! into a bounded channel; it stops as soon as the receiver is dropped,
//! which drops the HTTP response and releases its connection.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio::sync::mpsc;

use super::{CallEvent, CallEvents, CallStatus, Code, GrpcTransport, MethodDescriptor};
use crate::error::Result;
use crate::protocol::{encode_frame, FrameBuffer, FrameType, Metadata, GRPC_MESSAGE};

/// Content type for binary gRPC-Web.
pub const GRPC_WEB_CONTENT_TYPE: &str = "application/grpc-web+proto";

/// Capacity of the per-call event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// HTTP transport for gRPC-Web calls.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a fresh connection pool.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .build()?;
        Ok(Self { client })
    }

    /// Create a transport around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GrpcTransport for HttpTransport {
    async fn start(
        &self,
        method: &MethodDescriptor,
        host: &str,
        metadata: &Metadata,
        request: Bytes,
    ) -> Result<CallEvents> {
        let url = format!("{}{}", host.trim_end_matches('/'), method.path());
        let body = encode_frame(&request, FrameType::Message)?;

        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, GRPC_WEB_CONTENT_TYPE)
            .header(ACCEPT, GRPC_WEB_CONTENT_TYPE)
            .header("x-grpc-web", "1")
            .body(body);

        for (name, values) in metadata.iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }

        let http_request = builder.build()?;
        tracing::debug!(url = %url, "Starting gRPC-Web call");

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Some(status) = run_call(client, http_request, &tx).await {
                let _ = tx.send(CallEvent::End(status)).await;
            } else {
                tracing::debug!("Call abandoned by consumer, dropping response");
            }
        });

        Ok(rx)
    }
}

/// Send one event. `None` means the consumer went away.
async fn emit(events: &mpsc::Sender<CallEvent>, event: CallEvent) -> Option<()> {
    events.send(event).await.ok()
}

/// Drive one HTTP exchange, emitting events as they arrive.
///
/// Returns the terminal status, or `None` if the consumer dropped the
/// receiver before the call finished.
async fn run_call(
    client: reqwest::Client,
    request: reqwest::Request,
    events: &mpsc::Sender<CallEvent>,
) -> Option<CallStatus> {
    let response = tokio::select! {
        biased;
        _ = events.closed() => return None,
        result = client.execute(request) => match result {
            Ok(response) => response,
            Err(e) => return Some(CallStatus::new(Code::Unavailable, e.to_string())),
        },
    };

    let http_status = response.status();
    let headers = Metadata::from_http_headers(response.headers());
    let header_status = grpc_status(&headers);
    emit(events, CallEvent::Headers(headers)).await?;

    // Trailers-only response
    if let Some(status) = header_status {
        return Some(status);
    }

    if http_status != StatusCode::OK {
        return Some(CallStatus::new(
            Code::from_http_status(http_status.as_u16()),
            format!("unexpected HTTP status {}", http_status.as_u16()),
        ));
    }

    let mut body = response.bytes_stream();
    let mut buffer = FrameBuffer::new();

    loop {
        // A silent remote must not outlive the consumer
        let chunk = tokio::select! {
            biased;
            _ = events.closed() => return None,
            next = body.next() => match next {
                Some(chunk) => chunk,
                None => break,
            },
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Some(CallStatus::new(Code::Internal, e.to_string())),
        };

        let frames = match buffer.push(&chunk) {
            Ok(frames) => frames,
            Err(e) => return Some(CallStatus::new(Code::Internal, e.to_string())),
        };

        for frame in frames {
            match frame.frame_type {
                FrameType::Message => {
                    emit(events, CallEvent::Message(frame.payload)).await?;
                }
                FrameType::Header => {
                    let trailers = match parse_trailers(&frame.payload) {
                        Ok(trailers) => trailers,
                        Err(message) => return Some(CallStatus::new(Code::Internal, message)),
                    };
                    let status = grpc_status(&trailers).unwrap_or_else(|| {
                        CallStatus::new(Code::Internal, "Trailers missing grpc-status")
                    });
                    emit(events, CallEvent::Headers(trailers)).await?;
                    return Some(status);
                }
                FrameType::Reserved(byte) => {
                    return Some(CallStatus::new(
                        Code::Internal,
                        format!("unsupported frame type 0x{:02x}", byte),
                    ));
                }
            }
        }
    }

    if !buffer.is_empty() {
        return Some(CallStatus::new(Code::Internal, "Response body ended mid-frame"));
    }

    Some(CallStatus::new(
        Code::Internal,
        "Response closed without grpc-status",
    ))
}

/// Terminal status as the remote reported it.
///
/// Every `grpc-message` value is joined into the message. A missing
/// `grpc-message` reads as an empty message, so a bare non-OK code still
/// fails the call.
fn grpc_status(metadata: &Metadata) -> Option<CallStatus> {
    let status = CallStatus::from_metadata(metadata)?;
    Some(CallStatus::new(status.code, metadata.get(GRPC_MESSAGE).concat()))
}

fn parse_trailers(payload: &[u8]) -> std::result::Result<Metadata, String> {
    let text = std::str::from_utf8(payload).map_err(|e| format!("trailers are not text: {}", e))?;
    Metadata::parse(text).map_err(|e| e.to_string())
}
