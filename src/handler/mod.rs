//! Handler module - host method registration and dispatch.
//!
//! Provides:
//! - [`PluginApi`] - the host's registration surface
//! - [`HandlerRegistry`] - maps method names to handlers
//! - [`HostBytes`] / [`HandlerReply`] - host-facing argument and reply shapes

mod payload;
mod registry;

pub use payload::{HandlerReply, HostBytes};
pub use registry::{
    BoxFuture, Handler, HandlerRegistry, HandlerResult, MethodOptions, PluginApi, TypedHandler,
};
