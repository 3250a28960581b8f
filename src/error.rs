//! Request-path error taxonomy.
//!
//! Configuration errors live in `config::loader` and only occur at startup.
//! Everything here is mapped to an HTTP status in `http::response`.

use thiserror::Error;

use crate::auth::introspection::IntrospectionError;

/// Why a request could not be authenticated.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("missing or malformed bearer credential")]
    MissingCredential,

    #[error("credential is not active")]
    Inactive,

    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
}

/// Errors produced while handling a single request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route matched the path and method.
    #[error("no route matched")]
    NoRouteMatch,

    /// A credential was required and could not be validated.
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] AuthFailure),

    /// The subject lacks the roles required by every matched rule.
    #[error("forbidden: insufficient roles for route '{route}'")]
    Forbidden { route: String },

    /// The request body exceeded the buffering limit.
    #[error("request body too large")]
    PayloadTooLarge,

    /// The request body could not be read (client reset or malformed framing).
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// The upstream could not be reached or failed mid-response.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// The forwarded request could not be constructed.
    #[error("failed to build upstream request: {0}")]
    Internal(String),
}

/// Result type for request handling.
pub type GatewayResult<T> = Result<T, GatewayError>;
