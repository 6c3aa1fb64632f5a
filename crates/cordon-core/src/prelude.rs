//! Convenience re-exports for downstream crates.

pub use crate::envelope::{ControlEnvelope, ControlRequest, TransportFrame};
pub use crate::flow::Flow;
pub use crate::id::{ContextId, LinkId};
pub use crate::manifest::{resolve_script_path, Manifest};
