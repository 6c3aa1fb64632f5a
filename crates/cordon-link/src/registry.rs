//! Explicit inbound-frame routing between co-hosted contexts.

use cordon_core::{ContextId, TransportFrame};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Maps context ids to inbound-frame receivers.
///
/// Replaces ambient global message listeners: a context that wants to
/// receive frames registers a sender here under its own id, and a peer
/// delivers by id. The registry is shared by every transport on one
/// host.
#[derive(Debug, Default)]
pub struct TransportRegistry {
    receivers: DashMap<ContextId, mpsc::UnboundedSender<TransportFrame>>,
}

impl TransportRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the inbound receiver for a context. A second
    /// registration under the same id replaces the first.
    pub fn register_receiver(
        &self,
        context_id: ContextId,
        sender: mpsc::UnboundedSender<TransportFrame>,
    ) {
        if self.receivers.insert(context_id.clone(), sender).is_some() {
            warn!(context_id = %context_id, "Replacing existing frame receiver");
        } else {
            debug!(context_id = %context_id, "Frame receiver registered");
        }
    }

    /// Remove a context's receiver, releasing the registration.
    pub fn unregister(&self, context_id: &ContextId) {
        if self.receivers.remove(context_id).is_some() {
            debug!(context_id = %context_id, "Frame receiver unregistered");
        }
    }

    /// Deliver a frame to the named context. Returns `false` when no
    /// receiver is registered or the receiver has gone away.
    pub fn deliver(&self, context_id: &ContextId, frame: TransportFrame) -> bool {
        match self.receivers.get(context_id) {
            Some(sender) => sender.send(frame).is_ok(),
            None => false,
        }
    }

    /// How many contexts currently have receivers registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    /// Whether no receivers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_to_registered_receiver() {
        let registry = TransportRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register_receiver(ContextId::new("a"), tx);

        let frame = TransportFrame::new("default", json!({"n": 1}));
        assert!(registry.deliver(&ContextId::new("a"), frame.clone()));
        assert_eq!(rx.recv().await.unwrap(), frame);
    }

    #[tokio::test]
    async fn delivery_without_receiver_fails() {
        let registry = TransportRegistry::new();
        let frame = TransportFrame::new("default", json!(null));
        assert!(!registry.deliver(&ContextId::new("missing"), frame));
    }

    #[tokio::test]
    async fn unregister_releases_receiver() {
        let registry = TransportRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register_receiver(ContextId::new("a"), tx);
        assert_eq!(registry.len(), 1);

        registry.unregister(&ContextId::new("a"));
        assert!(registry.is_empty());
        assert!(!registry.deliver(&ContextId::new("a"), TransportFrame::new("default", json!(null))));
    }
}
