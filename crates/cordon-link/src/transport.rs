//! The transport seam between a link and its isolation boundary.

use async_trait::async_trait;
use cordon_core::TransportFrame;
use tokio::sync::mpsc;

use crate::error::LinkResult;

/// Which side of the isolation boundary a transport sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// This side spawns the peer context.
    Spawn,
    /// This side *is* the spawned context and listens for its spawner.
    Listen,
}

/// Events a transport reports back to its owning link.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The transport is ready to carry frames. Emitted exactly once.
    Started,
    /// An inbound frame arrived from the remote side.
    Frame(TransportFrame),
}

/// One concrete way of moving frames across an isolation boundary.
///
/// A link owns exactly one transport. `start` hands the transport the
/// event sender it reports through; the transport emits
/// [`TransportEvent::Started`] once it can carry frames (immediately for
/// listeners, on the first inbound frame for spawners) and a
/// [`TransportEvent::Frame`] for every inbound frame.
#[async_trait]
pub trait Transport: Send {
    /// Which side of the boundary this transport is.
    fn kind(&self) -> TransportKind;

    /// Bring the transport up, reporting events through `events`.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport cannot begin starting at
    /// all. Asynchronous start-up failures (e.g. a spawn that dies
    /// later) go to the diagnostic sink instead.
    async fn start(&mut self, events: mpsc::UnboundedSender<TransportEvent>) -> LinkResult<()>;

    /// Post a frame to the remote side.
    ///
    /// # Errors
    ///
    /// Returns an error when no live handle exists to send through.
    fn send(&mut self, frame: TransportFrame) -> LinkResult<()>;

    /// Tear the transport down, releasing its handle. In-flight frames
    /// are lost.
    async fn stop(&mut self);
}
