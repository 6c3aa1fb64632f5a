//! Bootstrap orchestrator for Cordon contexts.
//!
//! A freshly created context has no identity and no capabilities. The
//! [`Bootstrap`] orchestrator drives the one-shot handshake that fixes
//! both: it sends a `create` request to the spawner, processes exactly
//! one reply carrying `{id, manifest, config}`, populates the context's
//! exported capability surface from the manifest's permissions,
//! dependencies and provides, announces `ready`, and finally imports
//! the manifest's user scripts.
//!
//! The orchestrator also owns the flow-to-channel map: one [`Channel`]
//! per flow name, created lazily and never removed, all multiplexed
//! over the context's single link.

pub mod bootstrap;
pub mod channel;
pub mod config;
pub mod error;
pub mod exports;
pub mod host;
pub mod proxy;
pub mod registry;

pub use bootstrap::{BootPhase, Bootstrap};
pub use channel::{pipe, Channel, MessagePort, PipeEnd};
pub use config::{ConfigTable, MergeMode};
pub use error::{BootError, BootResult};
pub use exports::{CapabilityBinding, Exports};
pub use host::{EnvelopeSender, HostContext, Poster, ScriptImporter};
pub use proxy::Proxy;
pub use registry::{ApiEntry, ApiRegistry, CoreService, StaticApiRegistry};
