//! The spawned-side transport: listen for frames from the spawner.

use std::sync::Arc;

use async_trait::async_trait;
use cordon_core::{ContextId, TransportFrame};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{LinkError, LinkResult};
use crate::registry::TransportRegistry;
use crate::transport::{Transport, TransportEvent, TransportKind};

/// Transport for the spawned side of an isolation boundary.
///
/// Registers an inbound receiver in the [`TransportRegistry`] under the
/// hosting context's id and forwards every arriving frame to the link.
/// There is no asynchronous spawn delay on this side, so `Started` is
/// signalled immediately.
pub struct ListenerTransport {
    registry: Arc<TransportRegistry>,
    local: ContextId,
    peer: ContextId,
    pump: Option<JoinHandle<()>>,
}

impl ListenerTransport {
    /// Build a listener transport for the context `local`, sending
    /// outbound frames to `peer` (its spawner).
    #[must_use]
    pub fn new(registry: Arc<TransportRegistry>, local: ContextId, peer: ContextId) -> Self {
        Self {
            registry,
            local,
            peer,
            pump: None,
        }
    }
}

#[async_trait]
impl Transport for ListenerTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Listen
    }

    async fn start(&mut self, events: mpsc::UnboundedSender<TransportEvent>) -> LinkResult<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.registry.register_receiver(self.local.clone(), tx);

        let forward = events.clone();
        self.pump = Some(tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if forward.send(TransportEvent::Frame(frame)).is_err() {
                    break;
                }
            }
        }));

        debug!(context_id = %self.local, "Listener transport started");
        let _ = events.send(TransportEvent::Started);
        Ok(())
    }

    fn send(&mut self, frame: TransportFrame) -> LinkResult<()> {
        if self.registry.deliver(&self.peer, frame) {
            Ok(())
        } else {
            Err(LinkError::PeerUnavailable(self.peer.clone()))
        }
    }

    async fn stop(&mut self) {
        self.registry.unregister(&self.local);
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        debug!(context_id = %self.local, "Listener transport stopped");
    }
}
