use thiserror::Error;

/// Errors that can occur during bootstrap operations.
///
/// Most bootstrap failure paths degrade silently: unknown
/// capability names are skipped, transport and import failures go to
/// the diagnostic sink. These variants cover the seams where a caller
/// still holds a `Result` — remote calls and host primitives.
#[derive(Debug, Error)]
pub enum BootError {
    /// The remote end went away before answering a call.
    #[error("remote call failed: channel closed")]
    ChannelClosed,
    /// `call` was invoked on a provider-mode proxy.
    #[error("proxy is in provider mode; calls flow inward")]
    ProviderMode,
    /// A script could not be imported.
    #[error("script import failed for {url}: {message}")]
    ImportFailed {
        /// The resolved script path.
        url: String,
        /// What went wrong.
        message: String,
    },
    /// The host's message-send primitive rejected an envelope.
    #[error("envelope post failed: {0}")]
    PostFailed(String),
    /// A wire payload failed to serialize or deserialize.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A specialized Result type for bootstrap operations.
pub type BootResult<T> = Result<T, BootError>;
