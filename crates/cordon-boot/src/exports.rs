//! The typed capability table exported to user code.

use std::collections::HashMap;

use serde_json::Value;

use crate::proxy::Proxy;

/// How one exported capability is wired.
///
/// Bindings are resolved once, while the handshake reply is processed,
/// instead of being attached incrementally onto a free-form object.
/// Materialization into a live [`Proxy`] happens lazily on first use.
#[derive(Debug, Clone)]
pub enum CapabilityBinding {
    /// A permission this context consumes: calls go out.
    Consumer {
        /// The API definition.
        definition: Value,
    },
    /// An API this context implements: calls come in.
    Provider {
        /// The API definition.
        definition: Value,
    },
    /// A manifest-declared dependency resolved by the host on demand.
    Dependency {
        /// Where the host finds the dependency.
        url: String,
    },
}

/// The capability surface a context exposes to its user code.
#[derive(Default)]
pub struct Exports {
    bindings: HashMap<String, CapabilityBinding>,
    materialized: HashMap<String, Proxy>,
    core: Option<Proxy>,
    default_export: Option<Proxy>,
}

impl Exports {
    /// An empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a capability, replacing any previous binding of that name.
    pub fn insert(&mut self, name: impl Into<String>, binding: CapabilityBinding) {
        self.bindings.insert(name.into(), binding);
    }

    /// Bind a capability only if the name is unused. Returns whether
    /// the binding was inserted.
    pub fn insert_if_absent(&mut self, name: &str, binding: CapabilityBinding) -> bool {
        if self.bindings.contains_key(name) {
            false
        } else {
            self.bindings.insert(name.to_string(), binding);
            true
        }
    }

    /// Whether a capability of this name is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Look up a binding.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&CapabilityBinding> {
        self.bindings.get(name)
    }

    /// The bound capability names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Remember the live proxy for a binding.
    pub fn materialize(&mut self, name: impl Into<String>, proxy: Proxy) {
        self.materialized.insert(name.into(), proxy);
    }

    /// A previously materialized proxy, if any.
    #[must_use]
    pub fn materialized(&self, name: &str) -> Option<&Proxy> {
        self.materialized.get(name)
    }

    /// Attach the always-present `core` proxy.
    pub fn set_core(&mut self, proxy: Proxy) {
        self.core = Some(proxy);
    }

    /// The `core` proxy.
    #[must_use]
    pub fn core(&self) -> Option<&Proxy> {
        self.core.as_ref()
    }

    /// Adopt a proxy as the default export if none is set yet.
    pub fn adopt_default(&mut self, proxy: &Proxy) {
        if self.default_export.is_none() {
            self.default_export = Some(proxy.clone());
        }
    }

    /// The default export surface, once adopted.
    #[must_use]
    pub fn default_export(&self) -> Option<&Proxy> {
        self.default_export.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn insert_if_absent_never_overwrites() {
        let mut exports = Exports::new();
        exports.insert(
            "helper",
            CapabilityBinding::Consumer {
                definition: json!({}),
            },
        );

        let inserted = exports.insert_if_absent(
            "helper",
            CapabilityBinding::Dependency {
                url: "helper/manifest.json".to_string(),
            },
        );
        assert!(!inserted);
        assert!(matches!(
            exports.binding("helper"),
            Some(CapabilityBinding::Consumer { .. })
        ));

        assert!(exports.insert_if_absent(
            "other",
            CapabilityBinding::Dependency {
                url: "other/manifest.json".to_string(),
            },
        ));
    }
}
