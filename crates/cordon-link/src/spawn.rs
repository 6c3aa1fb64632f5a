//! The spawning-side transport: launch a peer context and talk to it.

use std::sync::Arc;

use async_trait::async_trait;
use cordon_core::{LinkId, TransportFrame};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{LinkError, LinkResult};
use crate::transport::{Transport, TransportEvent, TransportKind};

/// Where the spawned context's program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSource {
    /// Load the context program from a path.
    Path(String),
    /// Instantiate the context from inline source text. The `name`
    /// carries a link-unique tag so artifacts generated from the same
    /// source never collide.
    Inline {
        /// Link-unique artifact name.
        name: String,
        /// The program source text.
        source: String,
    },
}

/// Everything a launcher needs to create one isolated context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    /// The program to run in the new context.
    pub source: ContextSource,
}

impl SpawnSpec {
    /// Spawn from a program path.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            source: ContextSource::Path(path.into()),
        }
    }

    /// Spawn from inline source text, tagged with the link's suffix so
    /// repeated spawns from the same source stay distinct.
    pub fn inline(source: impl Into<String>, link: LinkId) -> Self {
        Self {
            source: ContextSource::Inline {
                name: format!("inline-{}", link.suffix()),
                source: source.into(),
            },
        }
    }
}

/// The live handle a launcher returns for a spawned context.
pub struct ContextHandle {
    /// Frames destined for the spawned context.
    pub outbound: mpsc::UnboundedSender<TransportFrame>,
    /// Frames arriving from the spawned context.
    pub inbound: mpsc::UnboundedReceiver<TransportFrame>,
    /// Terminates the spawned context when signalled.
    pub shutdown: Option<oneshot::Sender<()>>,
}

/// Creates isolated contexts. Injected into [`SpawnTransport`] so the
/// link never touches host-specific spawning machinery directly.
#[async_trait]
pub trait ContextLauncher: Send + Sync {
    /// Launch a context from the given spec.
    ///
    /// # Errors
    ///
    /// Returns an error when the context cannot be created.
    async fn launch(&self, spec: SpawnSpec) -> LinkResult<ContextHandle>;
}

/// Transport for the spawning side of an isolation boundary.
///
/// Launches the peer through the injected [`ContextLauncher`]. Launch
/// failures go to the diagnostic sink and never surface to the caller.
/// The first inbound frame from the peer marks the handle live and
/// emits `Started` exactly once; every inbound frame (including the
/// first) is forwarded to the link.
pub struct SpawnTransport {
    launcher: Arc<dyn ContextLauncher>,
    spec: Option<SpawnSpec>,
    outbound: Option<mpsc::UnboundedSender<TransportFrame>>,
    shutdown: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<()>>,
}

impl SpawnTransport {
    /// Build a spawn transport that will launch `spec` on `start`.
    #[must_use]
    pub fn new(launcher: Arc<dyn ContextLauncher>, spec: SpawnSpec) -> Self {
        Self {
            launcher,
            spec: Some(spec),
            outbound: None,
            shutdown: None,
            pump: None,
        }
    }
}

#[async_trait]
impl Transport for SpawnTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Spawn
    }

    async fn start(&mut self, events: mpsc::UnboundedSender<TransportEvent>) -> LinkResult<()> {
        let Some(spec) = self.spec.take() else {
            debug!("Spawn transport already started");
            return Ok(());
        };

        let mut handle = match self.launcher.launch(spec).await {
            Ok(handle) => handle,
            Err(e) => {
                // Spawn failures never raise back through start.
                error!(error = %e, "Context launch failed");
                return Ok(());
            },
        };

        self.outbound = Some(handle.outbound.clone());
        self.shutdown = handle.shutdown.take();

        self.pump = Some(tokio::spawn(async move {
            let mut started = false;
            while let Some(frame) = handle.inbound.recv().await {
                if !started {
                    started = true;
                    if events.send(TransportEvent::Started).is_err() {
                        break;
                    }
                }
                if events.send(TransportEvent::Frame(frame)).is_err() {
                    break;
                }
            }
        }));

        Ok(())
    }

    fn send(&mut self, frame: TransportFrame) -> LinkResult<()> {
        match &self.outbound {
            Some(outbound) => outbound
                .send(frame)
                .map_err(|_| LinkError::TransportUnavailable),
            None => Err(LinkError::TransportUnavailable),
        }
    }

    async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.outbound = None;
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        debug!("Spawn transport stopped");
    }
}
