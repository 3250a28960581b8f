//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain connections (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup in `main`: config, logging, metrics, components, listener
//! - Shutdown has timeout: forced exit after the drain deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, DRAIN_TIMEOUT};
