//! Cordon Telemetry - Logging setup for the Cordon isolated-context
//! runtime.
//!
//! All diagnostic output in Cordon flows through the tracing ecosystem:
//! handshake progress, dropped frames and silently skipped capability
//! names are emitted as structured events rather than surfaced to
//! application code. This crate wires up the subscriber.
//!
//! # Example
//!
//! ```rust,no_run
//! use cordon_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), cordon_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("cordon_link=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("runtime starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{setup_default_logging, setup_logging, LogConfig, LogFormat};
