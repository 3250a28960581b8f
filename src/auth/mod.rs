//! Authentication and authorization subsystem.
//!
//! # Data Flow
//! ```text
//! Bearer credential
//!     → resolver.rs (cache lookup, authority on miss/expiry)
//!         → cache.rs (sharded map, lazy expiry)
//!         → introspection.rs (form POST, timeout, role extraction)
//!     → engine.rs (public/protected split, ALL/ANY role checks)
//!     → authorizer.rs (ties the above to a matched route)
//!     → Allow | Unauthenticated | Forbidden
//! ```
//!
//! # Design Decisions
//! - Credentials are always validated by the external authority
//! - Only active results are cached; revocations are seen on the next call
//! - Cache expiry is the sooner of the configured TTL and the token's own expiry

pub mod authorizer;
pub mod cache;
pub mod engine;
pub mod introspection;
pub mod resolver;

pub use authorizer::{Authorizer, RequestContext};
pub use cache::{CacheLookup, CredentialCache};
pub use engine::Decision;
pub use introspection::{IntrospectionClient, IntrospectionError, IntrospectionResult, RoleSet};
pub use resolver::CredentialResolver;
