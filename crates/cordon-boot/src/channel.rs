//! Per-flow channel endpoints and local pipes.

use std::sync::{Arc, Mutex};

use cordon_core::{ControlEnvelope, Flow};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::host::Poster;

/// Anything a proxy can sit on: something that posts messages outward
/// and yields the stream of messages arriving inward.
pub trait MessagePort: Send + Sync {
    /// Post a message to the remote end.
    fn post(&self, message: Value);

    /// Take the inbound message stream. Yields `Some` exactly once.
    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<Value>>;
}

/// A per-flow endpoint multiplexed over the context's link.
///
/// Channels are created lazily by the orchestrator, memoized per flow
/// name, and never removed. Outbound messages travel as flow-stamped
/// control envelopes through the shared [`Poster`]; inbound messages
/// are routed here by the orchestrator's envelope routing.
pub struct Channel {
    flow: Flow,
    poster: Arc<Poster>,
    incoming_tx: mpsc::UnboundedSender<Value>,
    incoming_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

impl Channel {
    /// Build the endpoint for `flow`.
    #[must_use]
    pub fn new(flow: Flow, poster: Arc<Poster>) -> Arc<Self> {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            flow,
            poster,
            incoming_tx,
            incoming_rx: Mutex::new(Some(incoming_rx)),
        })
    }

    /// The flow this channel serves.
    #[must_use]
    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// Deliver an inbound payload to this channel's consumer.
    pub fn on_message(&self, message: Value) {
        if self.incoming_tx.send(message).is_err() {
            debug!(flow = %self.flow, "Channel consumer gone, dropping message");
        }
    }
}

impl MessagePort for Channel {
    fn post(&self, message: Value) {
        self.poster
            .post(ControlEnvelope::flow_message(self.flow.clone(), message));
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.incoming_rx.lock().ok().and_then(|mut guard| guard.take())
    }
}

/// One end of a locally paired message pipe.
///
/// Pipes never cross an isolation boundary; they wire up capabilities
/// that live inside the context itself — notably the always-present
/// `core` API, which must be callable before any user script runs.
pub struct PipeEnd {
    to_peer: mpsc::UnboundedSender<Value>,
    incoming_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

impl MessagePort for PipeEnd {
    fn post(&self, message: Value) {
        let _ = self.to_peer.send(message);
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.incoming_rx.lock().ok().and_then(|mut guard| guard.take())
    }
}

/// Build a locally paired pipe: what one end posts, the other receives.
#[must_use]
pub fn pipe() -> (PipeEnd, PipeEnd) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        PipeEnd {
            to_peer: a_tx,
            incoming_rx: Mutex::new(Some(b_rx)),
        },
        PipeEnd {
            to_peer: b_tx,
            incoming_rx: Mutex::new(Some(a_rx)),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pipe_ends_are_cross_wired() {
        let (a, b) = pipe();
        let mut a_in = a.take_incoming().unwrap();
        let mut b_in = b.take_incoming().unwrap();

        a.post(json!("to b"));
        b.post(json!("to a"));

        assert_eq!(b_in.recv().await.unwrap(), json!("to b"));
        assert_eq!(a_in.recv().await.unwrap(), json!("to a"));
    }

    #[tokio::test]
    async fn incoming_stream_is_taken_once() {
        let (a, _b) = pipe();
        assert!(a.take_incoming().is_some());
        assert!(a.take_incoming().is_none());
    }
}
