//! Plugin adapter and builder.
//!
//! The [`BadgePluginBuilder`] configures the relay; [`BadgePlugin::plugin`]
//! registers the `badge_request` method with the host. Each host call:
//! 1. Decodes the `{ data }` argument
//! 2. Unframes the request and relays it to the badge server
//! 3. Returns the framed response, or the failure as a value
//!
//! # Example
//!
//! ```ignore
//! use badge_relay::handler::HandlerRegistry;
//! use badge_relay::BadgePlugin;
//!
//! let plugin = BadgePlugin::builder().build()?;
//! let mut registry = HandlerRegistry::new();
//! plugin.plugin(&mut registry);
//!
//! let reply = registry.dispatch("badge_request", &args).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::badge::{GenerateBadgeRequest, GenerateBadgeResponse, GENERATE_BADGE};
use crate::bridge::RpcBridge;
use crate::error::{RelayError, Result};
use crate::handler::{HandlerReply, HandlerResult, HostBytes, MethodOptions, PluginApi, TypedHandler};
use crate::relay::DEFAULT_TIMEOUT;
use crate::transport::{GrpcTransport, HttpTransport};

/// Plugin name reported to the host.
pub const PLUGIN_NAME: &str = "lavanet";

/// Method name registered with the host.
pub const BADGE_REQUEST_METHOD: &str = "badge_request";

/// Badge server address.
pub const DEFAULT_ENDPOINT: &str = "http://relay1.lumeweb.com:8082";

/// Project identifier stamped on every badge request.
pub const DEFAULT_PROJECT_ID: &str = "f195d68175eb091ec1f71d00f8952b85";

/// How much of the response the handler returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// Only the first message frame.
    Unary,
    /// Every header and message frame, once the call ends.
    #[default]
    Streaming,
}

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Badge server address.
    pub endpoint: String,
    /// Project identifier injected into requests.
    pub project_id: String,
    /// Deadline per exchange.
    pub timeout: Duration,
    /// Response mode.
    pub mode: ResponseMode,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_id: DEFAULT_PROJECT_ID.to_string(),
            timeout: DEFAULT_TIMEOUT,
            mode: ResponseMode::default(),
        }
    }
}

/// Argument of the `badge_request` method.
#[derive(Debug, Clone, Deserialize)]
pub struct BadgeRequest {
    /// Framed `GenerateBadgeRequest`.
    pub data: HostBytes,
}

/// Builder for configuring and creating a [`BadgePlugin`].
pub struct BadgePluginBuilder {
    config: RelayConfig,
    transport: Option<Arc<dyn GrpcTransport>>,
}

impl BadgePluginBuilder {
    /// Create a builder with the compiled-in defaults.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
            transport: None,
        }
    }

    /// Set the badge server address.
    ///
    /// Default: `http://relay1.lumeweb.com:8082`
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the project identifier.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.config.project_id = project_id.into();
        self
    }

    /// Set the per-exchange deadline.
    ///
    /// Default: 5 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the response mode.
    ///
    /// Default: [`ResponseMode::Streaming`]
    pub fn mode(mut self, mode: ResponseMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Use a specific transport instead of a new [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn GrpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Build the plugin.
    pub fn build(self) -> Result<BadgePlugin> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        let bridge = RpcBridge::new(
            transport,
            self.config.endpoint.clone(),
            self.config.project_id.clone(),
            self.config.timeout,
        );

        Ok(BadgePlugin {
            bridge,
            config: Arc::new(self.config),
        })
    }
}

impl Default for BadgePluginBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The badge relay plugin.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct BadgePlugin {
    bridge: RpcBridge,
    config: Arc<RelayConfig>,
}

impl BadgePlugin {
    /// Create a new plugin builder.
    pub fn builder() -> BadgePluginBuilder {
        BadgePluginBuilder::new()
    }

    /// Plugin name.
    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    /// Active configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Register `badge_request` with the host.
    pub fn plugin(&self, api: &mut dyn PluginApi) {
        let plugin = self.clone();
        let handler = TypedHandler::new(move |request: BadgeRequest| {
            let plugin = plugin.clone();
            async move { plugin.handle(request).await }
        });

        api.register_method(
            BADGE_REQUEST_METHOD,
            MethodOptions { cacheable: false },
            Box::new(handler),
        );
    }

    /// Handle one `badge_request` call.
    ///
    /// A malformed frame aborts with [`RelayError::InvalidData`]. Remote
    /// failures and timeouts are returned as [`HandlerReply::Error`].
    pub async fn handle(&self, request: BadgeRequest) -> HandlerResult {
        let frame = request.data.into_inner();

        let outcome = match self.config.mode {
            ResponseMode::Streaming => self
                .bridge
                .invoke_streaming::<GenerateBadgeRequest, GenerateBadgeResponse>(
                    &GENERATE_BADGE,
                    &frame,
                )
                .await
                .map(|response| HandlerReply::frames(response.into_frames())),
            ResponseMode::Unary => self
                .bridge
                .invoke_unary::<GenerateBadgeRequest, GenerateBadgeResponse>(
                    &GENERATE_BADGE,
                    &frame,
                )
                .await
                .map(HandlerReply::frame),
        };

        match outcome {
            Ok(reply) => Ok(reply),
            Err(RelayError::InvalidFrame(reason)) => {
                tracing::warn!(%reason, "Rejecting badge request");
                Err(RelayError::InvalidData)
            }
            Err(e) if e.is_reply_error() => Ok(HandlerReply::error(e.to_string())),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::Badge;
    use crate::codec::{MsgPackCodec, ProtoMessage};
    use crate::handler::HandlerRegistry;
    use crate::protocol::{encode_frame, FrameType, Metadata, GRPC_MESSAGE, GRPC_STATUS};
    use crate::transport::{CallEvent, CallStatus, Code, MockTransport};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Call {
        data: Vec<u8>,
    }

    fn badge_response() -> GenerateBadgeResponse {
        GenerateBadgeResponse {
            badge: Some(Badge {
                cu_allocation: 1000,
                epoch: 12,
                address: "lava@1consumer".into(),
                lava_chain_id: "lava-testnet-2".into(),
                project_sig: vec![9, 9, 9],
                virtual_epoch: 0,
            }),
            get_pairing_response: vec![],
            badge_signer_address: "lava@1signer".into(),
            spec: vec![],
        }
    }

    fn request_frame() -> Vec<u8> {
        let request = GenerateBadgeRequest {
            badge_address: "lava@1consumer".into(),
            project_id: String::new(),
            spec_id: "LAV1".into(),
        };
        encode_frame(&request.serialize_to_bytes(), FrameType::Message)
            .unwrap()
            .to_vec()
    }

    fn plugin_with(transport: Arc<MockTransport>, mode: ResponseMode) -> BadgePlugin {
        BadgePlugin::builder()
            .transport(transport)
            .mode(mode)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let builder = BadgePlugin::builder();
        let config = builder.config();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.project_id, DEFAULT_PROJECT_ID);
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.mode, ResponseMode::Streaming);
    }

    #[test]
    fn test_builder_configuration() {
        let builder = BadgePlugin::builder()
            .endpoint("http://localhost:1234")
            .project_id("p")
            .timeout(Duration::from_millis(250))
            .mode(ResponseMode::Unary);

        let config = builder.config().clone();
        assert_eq!(config.endpoint, "http://localhost:1234");
        assert_eq!(config.project_id, "p");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.mode, ResponseMode::Unary);
    }

    #[test]
    fn test_registers_non_cacheable_method() {
        let plugin = plugin_with(Arc::new(MockTransport::default()), ResponseMode::Streaming);
        let mut registry = HandlerRegistry::new();

        plugin.plugin(&mut registry);

        assert_eq!(plugin.name(), "lavanet");
        assert_eq!(
            registry.get_options(BADGE_REQUEST_METHOD),
            Some(MethodOptions { cacheable: false })
        );
    }

    #[tokio::test]
    async fn test_unary_reply_is_single_frame() {
        let message = badge_response().serialize_to_bytes();
        let transport = Arc::new(MockTransport::new(vec![
            CallEvent::Message(message.clone()),
            CallEvent::End(CallStatus::ok()),
        ]));
        let plugin = plugin_with(transport.clone(), ResponseMode::Unary);

        let reply = plugin
            .handle(BadgeRequest {
                data: HostBytes(request_frame()),
            })
            .await
            .unwrap();

        let expected = encode_frame(&message, FrameType::Message).unwrap().to_vec();
        assert_eq!(reply, HandlerReply::Frame(expected));

        let sent = GenerateBadgeRequest::deserialize_from_bytes(&transport.calls()[0].request)
            .unwrap();
        assert_eq!(sent.project_id, DEFAULT_PROJECT_ID);
        assert_eq!(transport.calls()[0].host, DEFAULT_ENDPOINT);
    }

    #[tokio::test]
    async fn test_short_data_is_invalid_and_not_sent() {
        let transport = Arc::new(MockTransport::default());
        let plugin = plugin_with(transport.clone(), ResponseMode::Unary);

        let err = plugin
            .handle(BadgeRequest {
                data: HostBytes(vec![0, 0, 0, 1]),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::InvalidData));
        assert_eq!(err.to_string(), "invalid data");
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_failure_is_an_error_value() {
        let mut trailers = Metadata::new();
        trailers.append(GRPC_STATUS, "8");
        trailers.append(GRPC_MESSAGE, "rate limited");
        let transport = Arc::new(MockTransport::new(vec![
            CallEvent::Headers(trailers),
            CallEvent::End(CallStatus::new(Code::ResourceExhausted, "rate limited")),
        ]));
        let plugin = plugin_with(transport, ResponseMode::Streaming);

        let reply = plugin
            .handle(BadgeRequest {
                data: HostBytes(request_frame()),
            })
            .await
            .unwrap();

        match reply {
            HandlerReply::Error { error } => assert!(error.contains("rate limited")),
            other => panic!("expected error reply, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_an_error_value() {
        let transport = Arc::new(MockTransport::hanging(vec![]));
        let plugin = plugin_with(transport, ResponseMode::Streaming);

        let reply = plugin
            .handle(BadgeRequest {
                data: HostBytes(request_frame()),
            })
            .await
            .unwrap();

        assert_eq!(reply, HandlerReply::error("Timeout exceeded"));
    }

    #[tokio::test]
    async fn test_dispatch_through_registry() {
        let message = badge_response().serialize_to_bytes();
        let mut leading = Metadata::new();
        leading.append("x", "1");
        let mut trailers = Metadata::new();
        trailers.append("y", "2");
        trailers.append(GRPC_STATUS, "0");

        let transport = Arc::new(MockTransport::new(vec![
            CallEvent::Headers(leading),
            CallEvent::Message(message.clone()),
            CallEvent::Headers(trailers),
            CallEvent::End(CallStatus::ok()),
        ]));
        let plugin = plugin_with(transport, ResponseMode::Streaming);
        let mut registry = HandlerRegistry::new();
        plugin.plugin(&mut registry);

        let args = MsgPackCodec::encode(&Call {
            data: request_frame(),
        })
        .unwrap();
        let reply = registry.dispatch(BADGE_REQUEST_METHOD, &args).await.unwrap();

        let frames: Vec<Vec<u8>> = MsgPackCodec::decode(&reply).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], encode_frame(b"x: 1\r\n", FrameType::Header).unwrap().to_vec());
        assert_eq!(frames[1], encode_frame(&message, FrameType::Message).unwrap().to_vec());
        assert_eq!(frames[2][0], 0x80);
    }
}
