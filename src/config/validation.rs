//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Enforce route/rule invariants before the route table is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Path patterns are compiled by the routing module, which owns the compiled form

use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RoleModeConfig, RouteConfig, RuleConfig};

/// A single semantic problem, located by its config path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `routes[2].rules[0].methods`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }

    validate_introspection(config, &mut errors);

    if config.cache.enabled && config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be > 0 when caching is enabled"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    for (i, route) in config.routes.iter().enumerate() {
        validate_route(i, route, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_introspection(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let introspection = &config.introspection;

    if introspection.url.is_empty() {
        errors.push(ValidationError::new("introspection.url", "is required"));
    } else {
        match Url::parse(&introspection.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "introspection.url",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "introspection.url",
                format!("invalid URL: {}", e),
            )),
        }
    }
    if introspection.client_id.is_empty() {
        errors.push(ValidationError::new("introspection.client_id", "is required"));
    }
    if introspection.client_secret.is_empty() {
        errors.push(ValidationError::new("introspection.client_secret", "is required"));
    }
    if introspection.timeout_ms == 0 {
        errors.push(ValidationError::new("introspection.timeout_ms", "must be > 0"));
    }
}

fn validate_route(index: usize, route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    let prefix = format!("routes[{}]", index);

    if route.path_pattern.is_empty() {
        errors.push(ValidationError::new(format!("{}.path_pattern", prefix), "is required"));
    }

    if route.upstream.is_empty() {
        errors.push(ValidationError::new(format!("{}.upstream", prefix), "is required"));
    } else {
        match Url::parse(&route.upstream) {
            Ok(url) if url.scheme() == "http" && url.host_str().is_some() => {}
            Ok(_) => errors.push(ValidationError::new(
                format!("{}.upstream", prefix),
                "must be an absolute http:// URL",
            )),
            Err(e) => errors.push(ValidationError::new(
                format!("{}.upstream", prefix),
                format!("invalid URL: {}", e),
            )),
        }
    }

    if let Some(strip) = &route.strip_prefix {
        if !strip.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.strip_prefix", prefix),
                "must start with '/'",
            ));
        }
    }

    if !route.methods.is_empty() || !route.required_roles.is_empty() || route.require_all_roles {
        errors.push(ValidationError::new(
            prefix.clone(),
            "route-level methods/required_roles/require_all_roles are not supported; use rules[]",
        ));
    }
    if route.require_auth.is_some() {
        errors.push(ValidationError::new(
            prefix.clone(),
            "route-level require_auth is not supported; use rules[].require_auth",
        ));
    }

    if route.rules.is_empty() {
        errors.push(ValidationError::new(
            prefix.clone(),
            "routes must define at least one rules entry",
        ));
    }
    for (j, rule) in route.rules.iter().enumerate() {
        validate_rule(&format!("{}.rules[{}]", prefix, j), rule, errors);
    }
}

fn validate_rule(prefix: &str, rule: &RuleConfig, errors: &mut Vec<ValidationError>) {
    if rule.methods.is_empty() {
        errors.push(ValidationError::new(format!("{}.methods", prefix), "is required"));
    }
    for method in &rule.methods {
        if method.is_empty() || Method::from_bytes(method.to_uppercase().as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("{}.methods", prefix),
                format!("'{}' is not an HTTP method", method),
            ));
        }
    }

    if !rule.requires_auth() && !rule.required_roles.is_empty() {
        errors.push(ValidationError::new(
            prefix,
            "rules with require_auth=false cannot define required_roles",
        ));
    }
    if rule.require_all_roles && rule.role_mode == Some(RoleModeConfig::Any) {
        errors.push(ValidationError::new(
            prefix,
            "require_all_roles=true conflicts with role_mode=\"any\"",
        ));
    }
    if rule.required_roles.iter().any(|r| r.is_empty()) {
        errors.push(ValidationError::new(
            format!("{}.required_roles", prefix),
            "role names must not be empty",
        ));
    }
}
