//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Authorized request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Pass to forwarder
//!
//! Audit record:
//!     → headers.rs (drop credential headers)
//! ```
//!
//! # Design Decisions
//! - No trust in client input beyond what is forwarded verbatim
//! - Credentials never reach the audit sink

pub mod headers;
