//! HTTP server setup and the gateway handler.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all gateway handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Run each request through match → authorize → forward
//! - Record request metrics and hand the request context to the audit sink
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, HttpBody},
    extract::{ConnectInfo, State},
    http::{header, request::Parts, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{Authorizer, CredentialResolver, IntrospectionClient, RequestContext};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::http::request::{extract_bearer, request_id, MakeGatewayRequestId, X_REQUEST_ID};
use crate::observability::audit::{AuditSink, PendingAudit};
use crate::observability::metrics;
use crate::proxy::Forwarder;
use crate::routing::Router as RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub authorizer: Authorizer,
    pub forwarder: Forwarder,
    pub audit: Arc<AuditSink>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Build the server from already-constructed components.
    pub fn new(config: GatewayConfig, routes: RouteTable, authorizer: Authorizer) -> Self {
        let state = AppState {
            routes: Arc::new(routes),
            authorizer,
            forwarder: Forwarder::new(),
            audit: Arc::new(AuditSink::new(config.audit.clone())),
        };
        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Compile routes and construct the authorization pipeline from a validated config.
    pub fn from_config(config: GatewayConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let routes = RouteTable::from_config(&config.routes)?;
        let client = IntrospectionClient::new(&config.introspection)?;
        let resolver = CredentialResolver::from_config(client, &config.cache);

        tracing::info!(
            routes = routes.len(),
            cache_enabled = config.cache.enabled,
            cache_ttl_secs = config.cache.ttl_secs,
            "Gateway components initialized"
        );

        Ok(Self::new(config, routes, Authorizer::new(resolver)))
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id(request.headers()),
                    )
                }),
            )
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeGatewayRequestId))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Gateway handler: every request passes through here.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let (parts, mut body) = request.into_parts();
    let mut ctx = RequestContext::default();

    let audit = if state.audit.wants(parts.method.as_str(), parts.uri.path()) {
        match axum::body::to_bytes(body, state.audit.max_body_bytes()).await {
            Ok(bytes) => {
                let pending = state.audit.begin(&parts, &bytes, Some(peer));
                body = Body::from(bytes);
                Some(pending)
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id(&parts.headers),
                    error = %e,
                    "Failed to buffer request body"
                );
                let err = if exceeded_length_limit(&e) {
                    GatewayError::PayloadTooLarge
                } else {
                    GatewayError::BodyRead(e.to_string())
                };
                let pending = state.audit.begin(&parts, &[], Some(peer));
                return finish(err.into_response(), &ctx, start, Some(pending));
            }
        }
    } else {
        None
    };

    let response = match handle(&state, parts, body, peer, &mut ctx).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                GatewayError::NoRouteMatch => tracing::debug!(error = %e, "Request rejected"),
                GatewayError::Upstream(_) | GatewayError::Internal(_) => {
                    tracing::error!(route = ctx.route.as_deref().unwrap_or("-"), error = %e, "Request failed")
                }
                _ => tracing::info!(route = ctx.route.as_deref().unwrap_or("-"), error = %e, "Request rejected"),
            }
            e.into_response()
        }
    };

    finish(response, &ctx, start, audit)
}

/// Match, authorize and forward one request.
async fn handle(
    state: &AppState,
    parts: Parts,
    body: Body,
    peer: SocketAddr,
    ctx: &mut RequestContext,
) -> GatewayResult<Response> {
    let matched = state
        .routes
        .match_request(parts.uri.path(), parts.method.as_str())
        .ok_or(GatewayError::NoRouteMatch)?;

    let credential = extract_bearer(&parts.headers);
    state.authorizer.authorize(&matched, credential, ctx).await?;

    state
        .forwarder
        .forward(matched.route, parts, body, Some(peer))
        .await
}

/// Whether a body read failed because it ran past the buffering limit.
fn exceeded_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn finish(
    response: Response,
    ctx: &RequestContext,
    start: Instant,
    audit: Option<PendingAudit>,
) -> Response {
    let status = response.status();
    metrics::record_request(ctx.route.as_deref().unwrap_or("none"), status.as_u16(), start);

    if let Some(pending) = audit {
        let response_size = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .or_else(|| HttpBody::size_hint(response.body()).exact())
            .unwrap_or(0);
        pending.finish(ctx, status, response_size);
    }
    response
}
