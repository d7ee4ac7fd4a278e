//! Integration tests for badge-relay.
//!
//! These run the plugin end-to-end against a local axum server that
//! answers like a gRPC-Web badge server.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use badge_relay::badge::{Badge, GenerateBadgeRequest, GenerateBadgeResponse, GENERATE_BADGE};
use badge_relay::codec::{MsgPackCodec, ProtoMessage};
use badge_relay::handler::{HandlerRegistry, HandlerReply, HostBytes};
use badge_relay::protocol::{decode_frame, encode_frame, FrameType};
use badge_relay::transport::GRPC_WEB_CONTENT_TYPE;
use badge_relay::{
    BadgePlugin, BadgeRequest, RelayError, ResponseMode, BADGE_REQUEST_METHOD, DEFAULT_PROJECT_ID,
};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

/// How the badge server answers `GenerateBadge`.
#[derive(Clone)]
enum Reply {
    /// 200 with this gRPC-Web body.
    Body(Vec<u8>),
    /// 200 with the status in the HTTP headers and no body.
    TrailersOnly {
        status: &'static str,
        message: &'static str,
    },
    /// Send the first part of a body, then stall.
    Stall(Vec<u8>),
    /// Never answer.
    Silent,
}

#[derive(Clone)]
struct BadgeServer {
    reply: Reply,
    seen: mpsc::UnboundedSender<SeenRequest>,
}

/// What the badge server received.
struct SeenRequest {
    headers: HeaderMap,
    body: Bytes,
}

async fn generate_badge(
    State(server): State<BadgeServer>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let _ = server.seen.send(SeenRequest { headers, body });

    match server.reply {
        Reply::Body(body) => ([("content-type", GRPC_WEB_CONTENT_TYPE)], body).into_response(),
        Reply::TrailersOnly { status, message } => (
            [
                ("content-type", GRPC_WEB_CONTENT_TYPE),
                ("grpc-status", status),
                ("grpc-message", message),
            ],
            Vec::<u8>::new(),
        )
            .into_response(),
        Reply::Stall(prefix) => {
            let body = stream::once(async move { Ok::<_, Infallible>(Bytes::from(prefix)) })
                .chain(stream::pending());
            (
                [("content-type", GRPC_WEB_CONTENT_TYPE)],
                Body::from_stream(body),
            )
                .into_response()
        }
        Reply::Silent => futures::future::pending::<Response>().await,
    }
}

/// Start a badge server on an ephemeral port.
async fn badge_server(reply: Reply) -> (String, mpsc::UnboundedReceiver<SeenRequest>) {
    let (seen, requests) = mpsc::unbounded_channel();
    let app = Router::new()
        .route(&GENERATE_BADGE.path(), post(generate_badge))
        .with_state(BadgeServer { reply, seen });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (endpoint, requests)
}

/// Accept one connection and never answer. Fires once the client hangs up.
async fn unresponsive_remote() -> (String, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let (hung_up_tx, hung_up_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        while let Ok(n) = stream.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
        let _ = hung_up_tx.send(());
    });

    (endpoint, hung_up_rx)
}

fn badge_response() -> GenerateBadgeResponse {
    GenerateBadgeResponse {
        badge: Some(Badge {
            cu_allocation: 5000,
            epoch: 42,
            address: "lava@1consumer".into(),
            lava_chain_id: "lava-testnet-2".into(),
            project_sig: vec![1, 2, 3, 4],
            virtual_epoch: 0,
        }),
        get_pairing_response: vec![0x0A, 0x00],
        badge_signer_address: "lava@1signer".into(),
        spec: vec![],
    }
}

fn request_frame() -> Vec<u8> {
    let request = GenerateBadgeRequest {
        badge_address: "lava@1consumer".into(),
        project_id: "overridden".into(),
        spec_id: "LAV1".into(),
    };
    encode_frame(&request.serialize_to_bytes(), FrameType::Message)
        .unwrap()
        .to_vec()
}

fn grpc_body(messages: &[&[u8]], trailers: &str) -> Vec<u8> {
    let mut body = Vec::new();
    for message in messages {
        body.extend_from_slice(&encode_frame(message, FrameType::Message).unwrap());
    }
    body.extend_from_slice(&encode_frame(trailers.as_bytes(), FrameType::Header).unwrap());
    body
}

fn plugin(endpoint: &str, mode: ResponseMode) -> BadgePlugin {
    BadgePlugin::builder()
        .endpoint(endpoint)
        .mode(mode)
        .build()
        .unwrap()
}

fn impatient_plugin(endpoint: &str) -> BadgePlugin {
    BadgePlugin::builder()
        .endpoint(endpoint)
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap()
}

fn call(frame: Vec<u8>) -> BadgeRequest {
    BadgeRequest {
        data: HostBytes(frame),
    }
}

#[tokio::test]
async fn test_streaming_over_http() {
    let message = badge_response().serialize_to_bytes();
    let body = grpc_body(&[&message[..]], "grpc-status: 0\r\ngrpc-message: OK\r\n");
    let (endpoint, mut requests) = badge_server(Reply::Body(body)).await;

    let reply = plugin(&endpoint, ResponseMode::Streaming)
        .handle(call(request_frame()))
        .await
        .unwrap();

    let frames = match reply {
        HandlerReply::Frames(frames) => frames,
        other => panic!("expected frames, got {:?}", other),
    };
    assert_eq!(frames.len(), 3);

    // HTTP response headers
    assert_eq!(frames[0][0], 0x80);
    let headers = String::from_utf8(decode_frame(&frames[0]).unwrap().to_vec()).unwrap();
    assert!(headers.contains("content-type: application/grpc-web+proto\r\n"));

    // The badge itself
    assert_eq!(frames[1], encode_frame(&message, FrameType::Message).unwrap().to_vec());

    // Trailers
    assert_eq!(
        frames[2],
        encode_frame(b"grpc-status: 0\r\ngrpc-message: OK\r\n", FrameType::Header)
            .unwrap()
            .to_vec()
    );

    let seen = requests.recv().await.unwrap();
    assert_eq!(seen.headers["x-grpc-web"], "1");
    assert_eq!(seen.headers["content-type"], GRPC_WEB_CONTENT_TYPE);

    let sent = GenerateBadgeRequest::deserialize_from_bytes(decode_frame(&seen.body).unwrap()).unwrap();
    assert_eq!(sent.project_id, DEFAULT_PROJECT_ID);
    assert_eq!(sent.badge_address, "lava@1consumer");
}

#[tokio::test]
async fn test_unary_over_http() {
    let message = badge_response().serialize_to_bytes();
    let body = grpc_body(&[&message[..], &b""[..]], "grpc-status: 0\r\n");
    let (endpoint, _requests) = badge_server(Reply::Body(body)).await;

    let reply = plugin(&endpoint, ResponseMode::Unary)
        .handle(call(request_frame()))
        .await
        .unwrap();

    assert_eq!(
        reply,
        HandlerReply::Frame(encode_frame(&message, FrameType::Message).unwrap().to_vec())
    );
}

#[tokio::test]
async fn test_error_trailers_over_http() {
    let body = grpc_body(&[], "grpc-status: 8\r\ngrpc-message: rate limited\r\n");
    let (endpoint, _requests) = badge_server(Reply::Body(body)).await;

    let reply = plugin(&endpoint, ResponseMode::Streaming)
        .handle(call(request_frame()))
        .await
        .unwrap();

    match reply {
        HandlerReply::Error { error } => {
            assert!(error.contains("rate limited"));
            assert!(error.starts_with("Failed fetching a badge from the badge server"));
        }
        other => panic!("expected error reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bare_error_status_over_http() {
    let body = grpc_body(&[], "grpc-status: 8\r\n");
    let (endpoint, _requests) = badge_server(Reply::Body(body)).await;

    let reply = plugin(&endpoint, ResponseMode::Streaming)
        .handle(call(request_frame()))
        .await
        .unwrap();

    assert_eq!(
        reply,
        HandlerReply::error("Failed fetching a badge from the badge server, message: ")
    );
}

#[tokio::test]
async fn test_trailers_only_response() {
    let (endpoint, _requests) = badge_server(Reply::TrailersOnly {
        status: "14",
        message: "upstream unavailable",
    })
    .await;

    let reply = plugin(&endpoint, ResponseMode::Streaming)
        .handle(call(request_frame()))
        .await
        .unwrap();

    match reply {
        HandlerReply::Error { error } => assert!(error.contains("upstream unavailable")),
        other => panic!("expected error reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let (endpoint, _requests) = badge_server(Reply::Silent).await;

    let started = std::time::Instant::now();
    let reply = impatient_plugin(&endpoint)
        .handle(call(request_frame()))
        .await
        .unwrap();

    assert_eq!(reply, HandlerReply::error("Timeout exceeded"));
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_stalled_body_times_out() {
    let message = badge_response().serialize_to_bytes();
    let prefix = encode_frame(&message, FrameType::Message).unwrap().to_vec();
    let (endpoint, _requests) = badge_server(Reply::Stall(prefix)).await;

    let reply = impatient_plugin(&endpoint)
        .handle(call(request_frame()))
        .await
        .unwrap();

    assert_eq!(reply, HandlerReply::error("Timeout exceeded"));
}

#[tokio::test]
async fn test_timeout_hangs_up_on_remote() {
    let (endpoint, hung_up) = unresponsive_remote().await;

    let reply = impatient_plugin(&endpoint)
        .handle(call(request_frame()))
        .await
        .unwrap();
    assert_eq!(reply, HandlerReply::error("Timeout exceeded"));

    tokio::time::timeout(Duration::from_secs(3), hung_up)
        .await
        .expect("connection still open after the timeout")
        .unwrap();
}

#[tokio::test]
async fn test_invalid_data_through_registry() {
    #[derive(serde::Serialize)]
    struct Call {
        data: Vec<u8>,
    }

    let (endpoint, mut requests) = badge_server(Reply::Silent).await;
    let mut registry = HandlerRegistry::new();
    plugin(&endpoint, ResponseMode::Streaming).plugin(&mut registry);

    let args = MsgPackCodec::encode(&Call { data: vec![0, 0] }).unwrap();
    let err = registry
        .dispatch(BADGE_REQUEST_METHOD, &args)
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::InvalidData));
    assert!(requests.try_recv().is_err());
}

#[tokio::test]
async fn test_length_mismatch_is_invalid_data() {
    let (endpoint, mut requests) = badge_server(Reply::Silent).await;

    let mut frame = request_frame();
    frame.push(0);

    let err = plugin(&endpoint, ResponseMode::Streaming)
        .handle(call(frame))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::InvalidData));
    assert!(requests.try_recv().is_err());
}
