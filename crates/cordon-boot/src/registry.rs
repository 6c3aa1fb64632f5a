//! Capability API lookup.

use std::collections::HashMap;

use serde_json::Value;

use crate::channel::PipeEnd;

/// One resolvable API: its canonical name and its definition (method
/// and event declarations, opaque to the orchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiEntry {
    /// Canonical API name; capability bindings are keyed by it.
    pub name: String,
    /// The API definition.
    pub definition: Value,
}

/// A host-side service instance backing the `core` API.
pub trait CoreService: Send {
    /// Bring the service up. Called once, before any user code runs.
    fn instantiate(&mut self);
}

/// Looks up API descriptors by permission name.
///
/// Unknown names yield `None`; the orchestrator skips them silently
/// rather than failing the handshake.
pub trait ApiRegistry: Send + Sync {
    /// Look up an API descriptor.
    fn get(&self, name: &str) -> Option<ApiEntry>;

    /// Build the host-side instance of a core-handled API, wired to one
    /// end of a local pipe.
    fn get_core(&self, name: &str, pipe_end: PipeEnd) -> Option<Box<dyn CoreService>>;
}

type CoreFactory = Box<dyn Fn(PipeEnd) -> Box<dyn CoreService> + Send + Sync>;

/// A fixed, in-memory registry. Suitable for embedders with a static
/// API surface and for tests.
#[derive(Default)]
pub struct StaticApiRegistry {
    apis: HashMap<String, Value>,
    core_factories: HashMap<String, CoreFactory>,
}

impl StaticApiRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an API definition.
    #[must_use]
    pub fn with_api(mut self, name: impl Into<String>, definition: Value) -> Self {
        self.apis.insert(name.into(), definition);
        self
    }

    /// Register a core service factory under `name`.
    #[must_use]
    pub fn with_core(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(PipeEnd) -> Box<dyn CoreService> + Send + Sync + 'static,
    ) -> Self {
        self.core_factories.insert(name.into(), Box::new(factory));
        self
    }
}

impl ApiRegistry for StaticApiRegistry {
    fn get(&self, name: &str) -> Option<ApiEntry> {
        self.apis.get(name).map(|definition| ApiEntry {
            name: name.to_string(),
            definition: definition.clone(),
        })
    }

    fn get_core(&self, name: &str, pipe_end: PipeEnd) -> Option<Box<dyn CoreService>> {
        self.core_factories.get(name).map(|factory| factory(pipe_end))
    }
}
