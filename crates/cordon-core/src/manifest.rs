//! Context manifests.
//!
//! A manifest declares everything a spawner needs to know about a
//! context before any of its user code runs: the script(s) to import,
//! the permissions it requests, the APIs it provides, and the
//! dependencies it expects the host to resolve. Every collection
//! defaults to empty so a partial manifest still deserializes; unknown
//! names inside the collections are skipped at load time rather than
//! rejected here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Declarative descriptor of a context's capability surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Manifest {
    /// The application entry: which script(s) to import once the
    /// handshake assigns an identity.
    #[serde(default)]
    pub app: AppEntry,
    /// API names this context wants to consume.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// API names this context implements for remote callers.
    #[serde(default)]
    pub provides: Vec<String>,
    /// Named dependencies the host resolves on request (`name -> url`).
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// The application entry of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppEntry {
    /// One script path or an ordered list of them.
    #[serde(default)]
    pub script: ScriptRef,
}

/// One script path or several, imported in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptRef {
    /// A single script path.
    Single(String),
    /// An ordered list of script paths.
    Multiple(Vec<String>),
}

impl Default for ScriptRef {
    fn default() -> Self {
        Self::Multiple(Vec::new())
    }
}

impl ScriptRef {
    /// Iterate over the script paths in import order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::Single(s) => std::slice::from_ref(s).iter(),
            Self::Multiple(v) => v.iter(),
        }
        .map(String::as_str)
    }

    /// Whether the manifest names no scripts at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Multiple(v) => v.is_empty(),
        }
    }
}

/// Resolve a manifest script path against the context's assigned id.
///
/// Absolute paths and URLs pass through unchanged. Relative paths are
/// resolved against the directory portion of the id; an id with no
/// directory portion leaves the path as-is.
#[must_use]
pub fn resolve_script_path(script: &str, id: &str) -> String {
    if script.starts_with('/') || script.contains("://") {
        return script.to_string();
    }
    match id.rfind('/') {
        Some(idx) => format!("{}/{script}", &id[..idx]),
        None => script.to_string(),
    }
}
