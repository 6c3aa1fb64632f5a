//! Flow names: logical sub-channels multiplexed over one link.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A string key identifying one logical sub-channel on a link.
///
/// Two names are reserved: [`Flow::DEFAULT`] is used when application
/// code asks for a channel without naming one, and [`Flow::CONTROL`]
/// carries only handshake and lifecycle envelopes. The control flow is
/// never exposed to application code as a capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flow(String);

impl Flow {
    /// The flow used when no flow name is given.
    pub const DEFAULT: &'static str = "default";
    /// The flow reserved for handshake and lifecycle traffic.
    pub const CONTROL: &'static str = "control";

    /// Create a flow from an arbitrary name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `default` flow.
    #[must_use]
    pub fn default_flow() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// The `control` flow.
    #[must_use]
    pub fn control() -> Self {
        Self(Self::CONTROL.to_string())
    }

    /// Whether this is one of the two reserved flow names.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.0 == Self::DEFAULT || self.0 == Self::CONTROL
    }

    /// Whether this is the control flow.
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.0 == Self::CONTROL
    }

    /// The flow name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Flow {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Flow {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
