//! Transport links between isolated Cordon contexts.
//!
//! A [`Link`] is the single bidirectional frame transport a context owns.
//! It hides whether this side spawned the other context or is itself the
//! spawned side: the two cases are concrete [`Transport`] implementations
//! ([`SpawnTransport`] and [`ListenerTransport`]) chosen by the owning
//! context at construction time. Frames delivered before the transport
//! reaches `Started` are held in a bounded FIFO queue and flushed in
//! order exactly once.
//!
//! Inbound routing is explicit: a [`TransportRegistry`] maps context ids
//! to frame receivers instead of relying on ambient global listeners.

pub mod error;
pub mod link;
pub mod listener;
pub mod registry;
pub mod spawn;
pub mod transport;

pub use error::{LinkError, LinkResult};
pub use link::{Link, LinkState, MAX_PENDING_FRAMES};
pub use listener::ListenerTransport;
pub use registry::TransportRegistry;
pub use spawn::{ContextHandle, ContextLauncher, ContextSource, SpawnSpec, SpawnTransport};
pub use transport::{Transport, TransportEvent, TransportKind};
