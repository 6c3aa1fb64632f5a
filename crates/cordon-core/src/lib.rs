//! Wire types for the Cordon isolated-context runtime.
//!
//! Cordon lets mutually distrusting program fragments run in separate
//! isolated contexts and talk only through structured, multiplexed
//! messages. This crate defines the vocabulary every other crate shares:
//! flows, context and link identifiers, the transport frame that crosses
//! an isolation boundary, the control envelope that carries handshake and
//! lifecycle traffic, and the manifest that declares what a context may
//! do once it has an identity.

pub mod envelope;
pub mod flow;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod relay;

pub use envelope::{ControlEnvelope, ControlRequest, TransportFrame};
pub use flow::Flow;
pub use id::{ContextId, LinkId};
pub use manifest::{resolve_script_path, AppEntry, Manifest, ScriptRef};
