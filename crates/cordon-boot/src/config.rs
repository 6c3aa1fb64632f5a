//! Free-form context configuration with deep merging.

use serde_json::{Map, Value};

/// How `merge` treats nested objects already present in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Tables merge recursively per-field; scalars and arrays from the
    /// overlay replace the base value.
    Deep,
    /// Overlay keys replace base values wholesale.
    Replace,
}

/// The merged configuration of one context.
///
/// Config arrives in layers — embedder options first, then whatever the
/// spawner sends in the handshake reply — with later keys overriding
/// earlier ones. Well-known keys get typed accessors; everything else
/// stays available as raw JSON.
#[derive(Debug, Clone, Default)]
pub struct ConfigTable {
    root: Map<String, Value>,
}

impl ConfigTable {
    /// An empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `options` into the table. Non-object values are ignored.
    pub fn merge(&mut self, options: &Value, mode: MergeMode) {
        let Some(overlay) = options.as_object() else {
            return;
        };
        for (key, overlay_val) in overlay {
            match mode {
                MergeMode::Deep => {
                    if let Some(base_val) = self.root.get_mut(key) {
                        deep_merge(base_val, overlay_val);
                    } else {
                        self.root.insert(key.clone(), overlay_val.clone());
                    }
                },
                MergeMode::Replace => {
                    self.root.insert(key.clone(), overlay_val.clone());
                },
            }
        }
    }

    /// Look up a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Whether diagnostic envelopes should be forwarded.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.truthy("debug")
    }

    /// Whether the dynamic script-import capability is withheld from
    /// this context.
    #[must_use]
    pub fn strong_isolation(&self) -> bool {
        self.truthy("strongIsolation")
    }

    /// Target origin for posted envelopes, when the host's send
    /// primitive takes one. Replaces arity sniffing on the primitive.
    #[must_use]
    pub fn post_origin(&self) -> Option<String> {
        self.root
            .get("postOrigin")
            .and_then(Value::as_str)
            .map(ToString::to_string)
    }

    /// The whole table as a JSON value.
    #[must_use]
    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    fn truthy(&self, key: &str) -> bool {
        self.root.get(key).is_some_and(|v| v.as_bool() == Some(true))
    }
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Objects merge recursively per-field.
/// - Scalars and arrays from the overlay replace the base value.
fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                if let Some(base_val) = base_map.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_map.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}
