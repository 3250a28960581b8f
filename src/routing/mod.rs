//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, method)
//!     → router.rs (ordered route scan)
//!     → rule.rs (pattern + per-rule method checks)
//!     → Return: matched Route with its method-matching Rules, or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile path patterns (case-insensitive regex)
//!     → Normalize rule methods to uppercase
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (configuration order)

pub mod router;
pub mod rule;

pub use router::{RouteMatch, Router};
pub use rule::{RoleMode, Route, Rule, UpstreamTarget};
