//! In-memory transport that replays a fixed event script.
//!
//! Available in unit tests and with the `testing` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{CallEvent, CallEvents, GrpcTransport, MethodDescriptor, EVENT_CHANNEL_CAPACITY};
use crate::error::Result;
use crate::protocol::Metadata;

/// A request the mock transport received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub path: String,
    pub host: String,
    pub request: Bytes,
}

/// Mock implementation of GrpcTransport for testing.
///
/// Every call replays the same script. A hanging mock keeps the call open
/// after the script until the consumer drops it.
#[derive(Default)]
pub struct MockTransport {
    script: Vec<CallEvent>,
    hang: bool,
    started: AtomicUsize,
    dropped: std::sync::Arc<AtomicUsize>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new(script: Vec<CallEvent>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// A mock that replays `script` and then never ends the call.
    pub fn hanging(script: Vec<CallEvent>) -> Self {
        Self {
            script,
            hang: true,
            ..Self::default()
        }
    }

    /// Number of calls started.
    pub fn call_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of calls whose consumer went away before the script finished.
    pub fn abandoned_count(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GrpcTransport for MockTransport {
    async fn start(
        &self,
        method: &MethodDescriptor,
        host: &str,
        _metadata: &Metadata,
        request: Bytes,
    ) -> Result<CallEvents> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                path: method.path(),
                host: host.to_string(),
                request,
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let script = self.script.clone();
        let hang = self.hang;
        let dropped = self.dropped.clone();

        tokio::spawn(async move {
            for event in script {
                if tx.send(event).await.is_err() {
                    dropped.fetch_add(1, Ordering::SeqCst);
                    return;
                }
            }
            if hang {
                tx.closed().await;
                dropped.fetch_add(1, Ordering::SeqCst);
            }
        });

        Ok(rx)
    }
}
