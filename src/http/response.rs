//! Error responses.
//!
//! # Responsibilities
//! - Map request-path errors to HTTP status codes
//! - Keep bodies generic: no role names, no authority responses
//!
//! # Design Decisions
//! - 401 always carries `WWW-Authenticate: Bearer`
//! - The cause is logged server-side, never sent to the client

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;

impl GatewayError {
    /// Status code this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRouteMatch => StatusCode::NOT_FOUND,
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::BodyRead(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            GatewayError::NoRouteMatch => "Route not found",
            GatewayError::Unauthenticated(_) => "Unauthorized",
            GatewayError::Forbidden { .. } => "Insufficient permissions",
            GatewayError::PayloadTooLarge => "Request body too large",
            GatewayError::BodyRead(_) => "Bad request",
            GatewayError::Upstream(_) => "Upstream request failed",
            GatewayError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.public_message()).into_response();
        if matches!(self, GatewayError::Unauthenticated(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
