//! The bootstrap orchestrator and its one-shot handshake.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cordon_core::{resolve_script_path, ContextId, ControlEnvelope, Flow, Manifest};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::channel::{pipe, Channel};
use crate::config::{ConfigTable, MergeMode};
use crate::exports::{CapabilityBinding, Exports};
use crate::host::{EnvelopeSender, HostContext, Poster};
use crate::proxy::Proxy;
use crate::registry::ApiRegistry;

/// The handshake phases of a context. One-shot and non-reentrant:
/// `Running` is terminal and no phase is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    /// Fresh context: empty config, channels and manifest.
    Created,
    /// `create` sent; waiting for the spawner's single reply.
    AwaitingId,
    /// Identity and manifest extracted, config merged.
    Configured,
    /// Capability surface populated, `ready` announced.
    Ready,
    /// User scripts imported. Terminal.
    Running,
}

/// Assigns identity and capabilities to a freshly created context.
///
/// Owns the flow-to-channel map and the exported capability surface.
/// The first [`get_channel`](Bootstrap::get_channel) or
/// [`get_proxy`](Bootstrap::get_proxy) call triggers the handshake;
/// exactly one `create` request is sent per context lifetime and
/// exactly one reply is processed. Inbound envelopes are routed through
/// [`handle_inbound`](Bootstrap::handle_inbound), which the embedder
/// wires to the hosting context's message event (or drives via
/// [`pump`](Bootstrap::pump)).
pub struct Bootstrap {
    phase: BootPhase,
    config: ConfigTable,
    poster: Arc<Poster>,
    channels: HashMap<Flow, Arc<Channel>>,
    manifest: Option<Manifest>,
    id: Option<ContextId>,
    exports: Option<Exports>,
    registry: Arc<dyn ApiRegistry>,
    host: Box<dyn HostContext>,
}

impl Bootstrap {
    /// Build an orchestrator over the host's send primitive, an API
    /// registry and the hosting context.
    #[must_use]
    pub fn new(
        sender: Box<dyn EnvelopeSender>,
        registry: Arc<dyn ApiRegistry>,
        host: Box<dyn HostContext>,
    ) -> Self {
        Self {
            phase: BootPhase::Created,
            config: ConfigTable::new(),
            poster: Arc::new(Poster::new(sender)),
            channels: HashMap::new(),
            manifest: None,
            id: None,
            exports: None,
            registry,
            host,
        }
    }

    /// Current handshake phase.
    #[must_use]
    pub fn phase(&self) -> BootPhase {
        self.phase
    }

    /// The identity assigned by the spawner, once the handshake reply
    /// has been processed.
    #[must_use]
    pub fn id(&self) -> Option<&ContextId> {
        self.id.as_ref()
    }

    /// The manifest assigned by the spawner.
    #[must_use]
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// The merged configuration.
    #[must_use]
    pub fn config(&self) -> &ConfigTable {
        &self.config
    }

    /// The exported capability surface, once anything has touched it.
    #[must_use]
    pub fn exports(&self) -> Option<&Exports> {
        self.exports.as_ref()
    }

    /// Merge options into the shared config; later keys override
    /// earlier ones. Nested objects are deep-merged.
    pub fn configure(&mut self, options: &Value) {
        self.configure_with(options, MergeMode::Deep);
    }

    /// Merge options with an explicit overwrite mode.
    pub fn configure_with(&mut self, options: &Value, mode: MergeMode) {
        self.config.merge(options, mode);
        self.poster.set_origin(self.config.post_origin());
    }

    /// The channel for a flow, created lazily and memoized; `None`
    /// means the `default` flow. Channels are never removed.
    ///
    /// Before the context has an identity this also triggers the
    /// handshake.
    pub fn get_channel(&mut self, flow: Option<Flow>) -> Arc<Channel> {
        if self.id.is_none() || self.manifest.is_none() {
            self.start();
        }
        let flow = flow.unwrap_or_else(Flow::default_flow);
        let poster = Arc::clone(&self.poster);
        Arc::clone(
            self.channels
                .entry(flow.clone())
                .or_insert_with(|| Channel::new(flow, poster)),
        )
    }

    /// A consumer proxy over [`get_channel`](Bootstrap::get_channel).
    /// The first proxy created becomes the default export surface.
    pub fn get_proxy(&mut self, flow: Option<Flow>) -> Proxy {
        let channel = self.get_channel(flow);
        let proxy = Proxy::new(channel, Value::Null, false);
        let exports = self.exports.get_or_insert_with(Exports::new);
        exports.adopt_default(&proxy);
        proxy
    }

    /// Begin the handshake: send the single `create` request. A no-op
    /// in every phase but `Created`.
    pub fn start(&mut self) {
        if self.phase != BootPhase::Created {
            return;
        }
        self.phase = BootPhase::AwaitingId;
        self.poster.post(ControlEnvelope::create());
    }

    /// Post an envelope through the hosting context's send primitive,
    /// stamping `fromApp`.
    pub fn post_message(&self, envelope: ControlEnvelope) {
        self.poster.post(envelope);
    }

    /// Forward a diagnostic envelope, if the `debug` config flag is
    /// set; otherwise a no-op.
    pub fn debug(&self, message: impl fmt::Display) {
        if self.config.debug() {
            self.poster.post(ControlEnvelope::debug(message));
        }
    }

    /// Route one inbound envelope.
    ///
    /// Envelopes whose `sourceFlow` matches an existing channel go to
    /// that channel; control envelopes go to the one-shot handshake
    /// handler; everything else is dropped. The context's own traffic
    /// (stamped `fromApp`) is never routed back into it.
    pub fn handle_inbound(&mut self, envelope: ControlEnvelope) {
        if envelope.from_app {
            return;
        }
        if let Some(channel) = self.channels.get(&envelope.source_flow) {
            channel.on_message(envelope.msg.unwrap_or(Value::Null));
        } else if envelope.source_flow.is_control() {
            self.handle_control(envelope);
        } else {
            debug!(flow = %envelope.source_flow, "Envelope for unknown flow dropped");
        }
    }

    /// Drive [`handle_inbound`](Bootstrap::handle_inbound) from an
    /// envelope stream until it closes.
    pub async fn pump(&mut self, envelopes: &mut mpsc::UnboundedReceiver<ControlEnvelope>) {
        while let Some(envelope) = envelopes.recv().await {
            self.handle_inbound(envelope);
        }
    }

    /// The live proxy for a bound capability, materializing it on
    /// first use.
    pub fn capability(&mut self, name: &str) -> Option<Proxy> {
        if let Some(proxy) = self.exports.as_ref().and_then(|e| e.materialized(name)) {
            return Some(proxy.clone());
        }
        let binding = self.exports.as_ref()?.binding(name)?.clone();
        let proxy = match binding {
            CapabilityBinding::Consumer { definition } => {
                let channel = self.get_channel(Some(Flow::new(name)));
                Proxy::new(channel, definition, false)
            },
            CapabilityBinding::Provider { definition } => {
                let channel = self.get_channel(None);
                Proxy::new(channel, definition, true)
            },
            CapabilityBinding::Dependency { .. } => {
                let proxy = self.get_proxy(Some(Flow::new(name)));
                self.poster.post(ControlEnvelope::dep(name));
                proxy
            },
        };
        if let Some(exports) = self.exports.as_mut() {
            exports.materialize(name, proxy.clone());
        }
        Some(proxy)
    }

    /// The always-present `core` proxy, once the handshake has run.
    #[must_use]
    pub fn core(&self) -> Option<Proxy> {
        self.exports.as_ref().and_then(Exports::core).cloned()
    }

    /// Process the handshake reply. One-shot: only the first reply in
    /// `AwaitingId` is acted on; later control envelopes of the same
    /// shape are ignored.
    fn handle_control(&mut self, envelope: ControlEnvelope) {
        if self.phase != BootPhase::AwaitingId {
            debug!(phase = ?self.phase, "Control envelope outside handshake ignored");
            return;
        }
        if !envelope.is_handshake_reply() {
            debug!("Control envelope without identity ignored");
            return;
        }

        self.phase = BootPhase::Configured;
        self.id = envelope.id;
        self.manifest = envelope.manifest;
        if let Some(config) = envelope.config {
            self.configure(&config);
        }

        self.load_permissions();
        self.load_dependencies();
        self.load_provides();

        self.poster.post(ControlEnvelope::ready());
        self.phase = BootPhase::Ready;

        self.import_scripts();
        self.phase = BootPhase::Running;
        debug!(id = ?self.id, "Context bootstrapped");
    }

    /// Bind a consumer capability for every resolvable manifest
    /// permission. Unknown names are skipped. The `core` API is always
    /// attached, wired through a local pipe so it is callable before
    /// any user script runs.
    pub fn load_permissions(&mut self) {
        let permissions = self
            .manifest
            .as_ref()
            .map(|m| m.permissions.clone())
            .unwrap_or_default();

        let exports = self.exports.get_or_insert_with(Exports::new);
        for name in permissions {
            match self.registry.get(&name) {
                Some(entry) => {
                    exports.insert(
                        entry.name,
                        CapabilityBinding::Consumer {
                            definition: entry.definition,
                        },
                    );
                },
                None => {
                    debug!(permission = %name, "Unknown permission skipped");
                },
            }
        }

        let (local_end, host_end) = pipe();
        if let Some(mut core) = self.registry.get_core("core", host_end) {
            core.instantiate();
        }
        let definition = self
            .registry
            .get("core")
            .map_or(Value::Null, |entry| entry.definition);
        exports.set_core(Proxy::new(Arc::new(local_end), definition, false));
    }

    /// Bind a dependency for every manifest-declared `name -> url`
    /// whose name is still unused. An existing export is never
    /// overwritten, but the host is still told about the dependency:
    /// the `dep` request fires immediately in that case.
    pub fn load_dependencies(&mut self) {
        let dependencies = self
            .manifest
            .as_ref()
            .map(|m| m.dependencies.clone())
            .unwrap_or_default();
        if dependencies.is_empty() {
            return;
        }

        let mut already_bound = Vec::new();
        {
            let exports = self.exports.get_or_insert_with(Exports::new);
            for (name, url) in &dependencies {
                let binding = CapabilityBinding::Dependency { url: url.clone() };
                if !exports.insert_if_absent(name, binding) {
                    already_bound.push(name.clone());
                }
            }
        }

        for name in already_bound {
            let _discarded = self.get_proxy(Some(Flow::new(&name)));
            self.poster.post(ControlEnvelope::dep(name));
        }
    }

    /// Bind a provider capability for every resolvable API the
    /// manifest lists under `provides`. Unknown names are skipped.
    pub fn load_provides(&mut self) {
        let provides = self
            .manifest
            .as_ref()
            .map(|m| m.provides.clone())
            .unwrap_or_default();

        let exports = self.exports.get_or_insert_with(Exports::new);
        for name in provides {
            match self.registry.get(&name) {
                Some(entry) => {
                    exports.insert(
                        entry.name,
                        CapabilityBinding::Provider {
                            definition: entry.definition,
                        },
                    );
                },
                None => {
                    debug!(provide = %name, "Unknown provide skipped");
                },
            }
        }
    }

    /// Import the manifest's scripts, resolved against the assigned
    /// id. Taking the native importer withdraws it from the host;
    /// without one, and unless strong isolation is configured, the
    /// fallback importer is used. Import failures are logged, never
    /// raised.
    fn import_scripts(&mut self) {
        let Some(manifest) = self.manifest.clone() else {
            return;
        };
        let Some(id) = self.id.clone() else {
            return;
        };
        if manifest.app.script.is_empty() {
            return;
        }

        let mut importer = match self.host.take_native_importer() {
            Some(importer) => importer,
            None if !self.config.strong_isolation() => self.host.fallback_importer(),
            None => {
                debug!("Strong isolation with no native importer: scripts withheld");
                return;
            },
        };

        for script in manifest.app.script.iter() {
            let url = resolve_script_path(script, id.as_str());
            if let Err(e) = importer.import(&url) {
                error!(url, error = %e, "Script import failed");
            }
        }
    }
}
