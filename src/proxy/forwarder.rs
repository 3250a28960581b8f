//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the route's upstream (prefix stripping)
//! - Forward method, headers and streamed body over a pooled client
//! - Return the upstream response unchanged apart from hop-by-hop headers
//!
//! # Design Decisions
//! - One shared hyper-util client; connections are pooled per upstream
//! - The outgoing Host is the upstream authority; the client's Host is
//!   carried in X-Forwarded-Host
//! - Upstream failures surface as `GatewayError::Upstream` (502)

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, request::Parts, Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::error::{GatewayError, GatewayResult};
use crate::routing::Route;
use crate::security::headers::{add_forwarded_headers, strip_hop_by_hop};

/// Sends authorized requests to their route's upstream.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }

    /// Forward a request to `route`'s upstream and return its response.
    pub async fn forward(
        &self,
        route: &Route,
        parts: Parts,
        body: Body,
        peer: Option<SocketAddr>,
    ) -> GatewayResult<Response<Body>> {
        let uri = upstream_uri(route, &parts.uri)?;

        let mut headers = parts.headers;
        let host = headers.remove(header::HOST);
        strip_hop_by_hop(&mut headers);
        add_forwarded_headers(&mut headers, peer.map(|p| p.ip()), host);

        let mut request = Request::builder()
            .method(parts.method)
            .uri(uri.clone())
            .body(body)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        *request.headers_mut() = headers;

        tracing::debug!(route = route.name(), upstream = %uri, "Forwarding request");

        let response: Response<Incoming> = self.client.request(request).await.map_err(|e| {
            tracing::error!(route = route.name(), upstream = %uri, error = %e, "Upstream error");
            GatewayError::from(e)
        })?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute upstream URI for an incoming request URI.
pub fn upstream_uri(route: &Route, incoming: &Uri) -> GatewayResult<Uri> {
    let path = route.forward_path(incoming.path());
    let path_and_query = match incoming.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    let upstream = route.upstream();
    Uri::builder()
        .scheme(upstream.scheme.clone())
        .authority(upstream.authority.clone())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| GatewayError::Internal(e.to_string()))
}
