//! Context and link identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity assigned to a context by its spawner during the
/// bootstrap handshake.
///
/// Opaque to the context itself; it is only valid after the handshake's
/// single reply has been processed. Script paths from the manifest are
/// resolved against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    /// Create a context id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContextId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContextId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Unique identifier for one transport link.
///
/// Each context owns exactly one link. The id disambiguates spawn
/// artifacts created from inline source text: two links spawning from
/// the same source must not collide, so the spawn spec is tagged with
/// this id's [`suffix`](LinkId::suffix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(Uuid);

impl LinkId {
    /// Generate a fresh link id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// A short fragment of the id, used to tag inline-source spawn
    /// specs so repeated spawns from the same source stay distinct.
    #[must_use]
    pub fn suffix(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_ids_are_unique() {
        assert_ne!(LinkId::generate(), LinkId::generate());
    }

    #[test]
    fn suffix_is_short_and_stable() {
        let id = LinkId::generate();
        assert_eq!(id.suffix().len(), 8);
        assert_eq!(id.suffix(), id.suffix());
    }

    #[test]
    fn context_id_round_trips() {
        let id: ContextId = serde_json::from_str("\"ctx-1\"").unwrap();
        assert_eq!(id.as_str(), "ctx-1");
    }
}
