//! The per-context link state machine.

use std::collections::VecDeque;

use cordon_core::{Flow, LinkId, TransportFrame};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::transport::{Transport, TransportEvent, TransportKind};

/// Maximum number of outbound frames held while the transport is still
/// starting. Frames delivered beyond this depth are dropped (newest
/// first) with a warning.
pub const MAX_PENDING_FRAMES: usize = 64;

/// The lifecycle of a link. `Stopped` is terminal; a link is never
/// restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Constructed, transport not yet started.
    Uninitialized,
    /// Spawned-side transport is registering its listener.
    Listening,
    /// Spawning-side transport is creating the peer context.
    Spawning,
    /// The transport carries frames.
    Started,
    /// Torn down. Terminal.
    Stopped,
}

/// Uniform bidirectional frame transport between two contexts.
///
/// One link per context; multiple flows multiplex over it. The link
/// hides whether this side spawned the other or is itself the spawned
/// side — that choice is the concrete [`Transport`] the owning context
/// constructed it with.
///
/// Frames delivered before the transport signals `Started` are held in
/// a bounded FIFO queue and flushed in enqueue order exactly once.
/// Transport failures are logged, never raised to callers.
pub struct Link {
    id: LinkId,
    state: LinkState,
    transport: Box<dyn Transport>,
    pending: VecDeque<TransportFrame>,
    local: mpsc::UnboundedSender<TransportFrame>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
}

impl Link {
    /// Build a link over `transport`, re-emitting inbound frames to
    /// `local`.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, local: mpsc::UnboundedSender<TransportFrame>) -> Self {
        Self {
            id: LinkId::generate(),
            state: LinkState::Uninitialized,
            transport,
            pending: VecDeque::new(),
            local,
            events: None,
        }
    }

    /// This link's unique id.
    #[must_use]
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Start the transport. The link enters `Listening` or `Spawning`
    /// depending on which side of the boundary it sits on, and reaches
    /// `Started` when the transport signals so.
    pub async fn start(&mut self) {
        if self.state != LinkState::Uninitialized {
            warn!(link_id = %self.id, state = ?self.state, "Ignoring start on a running link");
            return;
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.events = Some(events_rx);
        self.state = match self.transport.kind() {
            TransportKind::Listen => LinkState::Listening,
            TransportKind::Spawn => LinkState::Spawning,
        };

        if let Err(e) = self.transport.start(events_tx).await {
            // The link stays in its pre-started state; a stalled
            // transport surfaces as deferred frames that never flush.
            warn!(link_id = %self.id, error = %e, "Transport failed to start");
        }
    }

    /// Ingress from the local side destined for the remote side.
    ///
    /// A close request addressed to the control channel stops the link
    /// instead of being forwarded. Before `Started`, frames are
    /// deferred into the bounded pending queue.
    pub async fn deliver_message(&mut self, flow: Flow, message: Value) {
        let frame = TransportFrame::new(flow, message);

        if frame.is_control_close() {
            self.stop().await;
            return;
        }

        match self.state {
            LinkState::Started => {
                if let Err(e) = self.transport.send(frame) {
                    warn!(link_id = %self.id, error = %e, "Dropped outbound frame");
                }
            },
            LinkState::Stopped => {
                warn!(link_id = %self.id, "Dropped frame delivered to a stopped link");
            },
            _ => {
                if self.pending.len() < MAX_PENDING_FRAMES {
                    self.pending.push_back(frame);
                } else {
                    warn!(
                        link_id = %self.id,
                        depth = MAX_PENDING_FRAMES,
                        "Pending queue full, dropping newest frame"
                    );
                }
            },
        }
    }

    /// Apply one transport event to the state machine.
    ///
    /// `Started` flushes the pending queue in enqueue order, exactly
    /// once. Inbound frames are re-emitted to the local side.
    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Started => match self.state {
                LinkState::Listening | LinkState::Spawning => {
                    self.state = LinkState::Started;
                    debug!(link_id = %self.id, pending = self.pending.len(), "Link started");
                    while let Some(frame) = self.pending.pop_front() {
                        if let Err(e) = self.transport.send(frame) {
                            warn!(link_id = %self.id, error = %e, "Dropped deferred frame");
                        }
                    }
                },
                _ => {
                    debug!(link_id = %self.id, state = ?self.state, "Ignoring duplicate start signal");
                },
            },
            TransportEvent::Frame(frame) => {
                if self.local.send(frame).is_err() {
                    warn!(link_id = %self.id, "Local frame receiver gone, dropping inbound frame");
                }
            },
        }
    }

    /// Wait for and apply the next transport event. Returns `false`
    /// once no more events can arrive.
    pub async fn process_next(&mut self) -> bool {
        let Some(events) = self.events.as_mut() else {
            return false;
        };
        match events.recv().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            },
            None => false,
        }
    }

    /// Pump transport events until the transport goes away. Intended to
    /// be driven by the owning context's task.
    pub async fn run(&mut self) {
        while self.process_next().await {}
    }

    /// Tear the link down. Unconditional and non-draining: pending and
    /// in-flight frames are lost. Terminal.
    pub async fn stop(&mut self) {
        if self.state == LinkState::Stopped {
            return;
        }
        self.state = LinkState::Stopped;
        self.pending.clear();
        self.transport.stop().await;
        debug!(link_id = %self.id, "Link stopped");
    }
}
