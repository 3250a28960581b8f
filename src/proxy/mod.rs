//! Upstream proxying.
//!
//! # Data Flow
//! ```text
//! Authorized request + matched Route
//!     → forwarder.rs (URI rewrite, header rewrite, pooled client)
//!     → Upstream response streamed back
//! ```

pub mod forwarder;

pub use forwarder::Forwarder;
