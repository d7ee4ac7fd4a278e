//! # badge-relay
//!
//! Tunnels single gRPC-Web badge requests across a host plugin channel that
//! only carries opaque byte buffers.
//!
//! ## Architecture
//!
//! - **Frame codec** (`protocol`): `[type:1][length:4 BE][payload]` envelopes
//! - **Bounded relay** (`relay`): one deadline per exchange
//! - **RPC bridge** (`bridge`): one outbound call, events turned into frames
//! - **Plugin adapter** (`plugin`): the `badge_request` host method
//!
//! ## Example
//!
//! ```ignore
//! use badge_relay::handler::HandlerRegistry;
//! use badge_relay::BadgePlugin;
//!
//! #[tokio::main]
//! async fn main() -> badge_relay::Result<()> {
//!     let plugin = BadgePlugin::builder().build()?;
//!
//!     let mut registry = HandlerRegistry::new();
//!     plugin.plugin(&mut registry);
//!
//!     // `args` is the MsgPack-encoded `{ data }` object from the host
//!     let reply = registry.dispatch("badge_request", &args).await?;
//!     Ok(())
//! }
//! ```

pub mod badge;
pub mod bridge;
pub mod codec;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod relay;
pub mod transport;

mod plugin;

pub use error::{RelayError, Result};
pub use plugin::{
    BadgePlugin, BadgePluginBuilder, BadgeRequest, RelayConfig, ResponseMode,
    BADGE_REQUEST_METHOD, DEFAULT_ENDPOINT, DEFAULT_PROJECT_ID, PLUGIN_NAME,
};
