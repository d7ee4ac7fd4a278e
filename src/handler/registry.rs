//! Handler registry for dispatching host method calls by name.
//!
//! The host calls methods by name with a MsgPack-encoded argument object
//! and receives a MsgPack-encoded reply. Handlers returning `Err` abort the
//! call on the host; handlers returning [`HandlerReply::Error`] report a
//! failure as a value.
//!
//! # Example
//!
//! ```ignore
//! use badge_relay::handler::{HandlerRegistry, HandlerReply, MethodOptions};
//!
//! let mut registry = HandlerRegistry::new();
//!
//! registry.register("echo", MethodOptions::default(), |args: EchoArgs| async move {
//!     Ok(HandlerReply::frame(args.data.into_inner().into()))
//! });
//!
//! let reply = registry.dispatch("echo", &payload).await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde_json::json;

use super::HandlerReply;
use crate::codec::MsgPackCodec;
use crate::error::{RelayError, Result};

/// Result type for handler functions.
pub type HandlerResult = Result<HandlerReply>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Handle a call with the raw argument bytes.
    fn call(&self, data: &[u8]) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper that deserializes the argument before calling the handler.
pub struct TypedHandler<F, T, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<F, T, Fut> TypedHandler<F, T, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, Fut> Handler for TypedHandler<F, T, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, data: &[u8]) -> BoxFuture<'static, HandlerResult> {
        let parsed: T = match MsgPackCodec::decode(data) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        Box::pin((self.handler)(parsed))
    }
}

/// Registration options for a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodOptions {
    /// Whether the host may cache replies for identical arguments.
    pub cacheable: bool,
}

/// The host's method registration surface.
pub trait PluginApi {
    /// Register `handler` under `name`, replacing any previous handler.
    fn register_method(&mut self, name: &str, options: MethodOptions, handler: Box<dyn Handler>);
}

/// Entry for a registered method.
struct MethodEntry {
    handler: Box<dyn Handler>,
    options: MethodOptions,
}

/// Registry mapping method names to handlers.
pub struct HandlerRegistry {
    methods: HashMap<String, MethodEntry>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a typed handler.
    ///
    /// The argument is decoded from MsgPack into `T` before `handler` runs.
    pub fn register<F, T, Fut>(&mut self, name: &str, options: MethodOptions, handler: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_method(name, options, Box::new(TypedHandler::new(handler)));
    }

    /// Get a handler by method name.
    pub fn get_handler(&self, name: &str) -> Option<&dyn Handler> {
        self.methods.get(name).map(|e| e.handler.as_ref())
    }

    /// Get the options a method was registered with.
    pub fn get_options(&self, name: &str) -> Option<MethodOptions> {
        self.methods.get(name).map(|e| e.options)
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Describe the registered methods for the host.
    pub fn manifest(&self) -> serde_json::Value {
        let methods: serde_json::Map<String, serde_json::Value> = self
            .methods
            .iter()
            .map(|(name, entry)| (name.clone(), json!({ "cacheable": entry.options.cacheable })))
            .collect();

        json!({ "methods": methods })
    }

    /// The manifest as a JSON string.
    pub fn manifest_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.manifest())?)
    }

    /// Dispatch a call to the named handler.
    ///
    /// `payload` is the MsgPack-encoded argument; the reply is returned
    /// MsgPack-encoded.
    pub async fn dispatch(&self, name: &str, payload: &[u8]) -> Result<Vec<u8>> {
        let handler = self
            .get_handler(name)
            .ok_or_else(|| RelayError::HandlerNotFound(name.to_string()))?;

        match handler.call(payload).await {
            Ok(reply) => {
                if let HandlerReply::Error { error } = &reply {
                    tracing::warn!("Method {} replied with error: {}", name, error);
                }
                MsgPackCodec::encode(&reply)
            }
            Err(e) => {
                tracing::error!("Handler error for method {}: {}", name, e);
                Err(e)
            }
        }
    }
}

impl PluginApi for HandlerRegistry {
    fn register_method(&mut self, name: &str, options: MethodOptions, handler: Box<dyn Handler>) {
        if self.methods.contains_key(name) {
            tracing::warn!("Replacing handler for method {}", name);
        }
        self.methods
            .insert(name.to_string(), MethodEntry { handler, options });
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
