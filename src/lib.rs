//! Authorizing HTTP gateway library.
//!
//! Requests are matched against ordered routes, authorized by role rules
//! backed by an external token-introspection authority, and forwarded to
//! the route's upstream.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
