//! Seams to the hosting context: envelope posting and script import.

use std::fmt;
use std::sync::RwLock;

use cordon_core::ControlEnvelope;
use tracing::warn;

use crate::error::BootResult;

/// The hosting context's message-send primitive.
///
/// Some hosts take a `(payload, target-origin)` pair, others a bare
/// payload. Which form is used is decided by an explicit configuration
/// key (`postOrigin`), not by reflecting on the primitive.
pub trait EnvelopeSender: Send + Sync {
    /// Post an envelope.
    ///
    /// # Errors
    ///
    /// Returns an error when the primitive rejects the envelope.
    fn post(&self, envelope: &ControlEnvelope) -> BootResult<()>;

    /// Post an envelope restricted to a target origin.
    ///
    /// # Errors
    ///
    /// Returns an error when the primitive rejects the envelope.
    fn post_to_origin(&self, envelope: &ControlEnvelope, origin: &str) -> BootResult<()>;
}

/// Imports a script into the running context.
pub trait ScriptImporter: Send {
    /// Import the script at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the script cannot be loaded.
    fn import(&mut self, url: &str) -> BootResult<()>;
}

/// The hosting context as the orchestrator sees it.
pub trait HostContext: Send {
    /// Take the host's native script-import capability, if it exists.
    /// Taking it *is* the withdrawal: a second call returns `None`, and
    /// nothing that runs afterwards can reach the native importer
    /// through the host. Best-effort only, not a security boundary.
    fn take_native_importer(&mut self) -> Option<Box<dyn ScriptImporter>>;

    /// Build the fallback importer (dynamic script-element injection or
    /// the host's equivalent).
    fn fallback_importer(&mut self) -> Box<dyn ScriptImporter>;
}

/// Shared outbound envelope path.
///
/// Stamps `fromApp` on everything it posts and picks the origin-taking
/// form of the send primitive when an origin is configured. Send
/// failures are logged, never raised.
pub struct Poster {
    sender: Box<dyn EnvelopeSender>,
    origin: RwLock<Option<String>>,
}

impl Poster {
    /// Wrap a send primitive.
    #[must_use]
    pub fn new(sender: Box<dyn EnvelopeSender>) -> Self {
        Self {
            sender,
            origin: RwLock::new(None),
        }
    }

    /// Set or clear the configured target origin.
    pub fn set_origin(&self, origin: Option<String>) {
        if let Ok(mut guard) = self.origin.write() {
            *guard = origin;
        }
    }

    /// Post an envelope, stamping `fromApp`.
    pub fn post(&self, mut envelope: ControlEnvelope) {
        envelope.from_app = true;
        let origin = self
            .origin
            .read()
            .ok()
            .and_then(|guard| guard.clone());
        let result = match origin {
            Some(origin) => self.sender.post_to_origin(&envelope, &origin),
            None => self.sender.post(&envelope),
        };
        if let Err(e) = result {
            warn!(error = %e, "Envelope post failed");
        }
    }
}

impl fmt::Debug for Poster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poster").finish_non_exhaustive()
    }
}
