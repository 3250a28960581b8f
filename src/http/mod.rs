//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout layers)
//!     → request.rs (request ID header, bearer extraction)
//!     → [routing decides route and candidate rules]
//!     → [auth decides allow / 401 / 403]
//!     → [proxy forwards to upstream]
//!     → response.rs (error → status mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{extract_bearer, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
