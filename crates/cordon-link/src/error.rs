use cordon_core::ContextId;
use thiserror::Error;

/// Errors that can occur during link operations.
///
/// Transport failures are logged to the diagnostic sink rather than
/// surfaced to callers; these variants exist for the internal seams
/// (transport implementations, context launchers) where a `Result` is
/// still the right shape.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The transport has no live handle to send through.
    #[error("transport is not available")]
    TransportUnavailable,
    /// No receiver is registered for the peer context.
    #[error("no receiver registered for context {0}")]
    PeerUnavailable(ContextId),
    /// Launching the isolated context failed.
    #[error("context launch failed: {0}")]
    LaunchFailed(String),
}

/// A specialized Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
