//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and request handling settings.
    pub server: ServerConfig,

    /// Token introspection authority.
    pub introspection: IntrospectionConfig,

    /// Introspection result cache.
    pub cache: CacheConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Audit record emission.
    pub audit: AuditConfig,

    /// Route definitions, checked in order.
    pub routes: Vec<RouteConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for a request, including forwarding, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Token introspection endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IntrospectionConfig {
    /// Introspection endpoint URL.
    pub url: String,

    /// Client id sent with every introspection request.
    pub client_id: String,

    /// Client secret sent with every introspection request.
    pub client_secret: String,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_ms: 5_000,
        }
    }
}

/// Introspection cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching of active introspection results.
    pub enabled: bool,

    /// Upper bound on how long a result may be reused, in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Audit record configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit one audit record per request.
    pub enabled: bool,

    /// Path prefixes that are never audited.
    pub skip_paths: Vec<String>,

    /// Methods that are never audited.
    pub skip_methods: Vec<String>,

    /// Largest request body buffered for the audit record, in bytes.
    pub max_body_bytes: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            skip_paths: vec![
                "/health".to_string(),
                "/ping".to_string(),
                "/favicon.ico".to_string(),
                "/audit-logs".to_string(),
            ],
            skip_methods: vec!["OPTIONS".to_string()],
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Route configuration mapping a path pattern to an upstream.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    #[serde(default)]
    pub name: String,

    /// Regular expression matched case-insensitively against the request path.
    #[serde(default)]
    pub path_pattern: String,

    /// Upstream base URL (e.g., "http://users:8080").
    #[serde(default)]
    pub upstream: String,

    /// Prefix removed from the path before forwarding.
    #[serde(default)]
    pub strip_prefix: Option<String>,

    /// Authorization rules, evaluated in order.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Rejected during validation; policy lives on rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,

    /// Rejected during validation; policy lives on rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_roles: Vec<String>,

    /// Rejected during validation; policy lives on rules.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub require_all_roles: bool,

    /// Rejected during validation; policy lives on rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_auth: Option<bool>,
}

/// How a rule's required roles combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoleModeConfig {
    All,
    #[default]
    Any,
}

/// A method-scoped authorization rule attached to a route.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RuleConfig {
    /// HTTP methods this rule applies to.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Whether a credential is needed. Unset means required.
    #[serde(default)]
    pub require_auth: Option<bool>,

    /// Roles checked against the subject.
    #[serde(default)]
    pub required_roles: Vec<String>,

    /// Role combination mode.
    #[serde(default)]
    pub role_mode: Option<RoleModeConfig>,

    /// Older spelling of `role_mode = "all"`.
    #[serde(default)]
    pub require_all_roles: bool,
}

impl RuleConfig {
    /// Whether this rule needs an authenticated subject.
    pub fn requires_auth(&self) -> bool {
        self.require_auth.unwrap_or(true)
    }

    /// Effective role combination mode.
    pub fn effective_role_mode(&self) -> RoleModeConfig {
        match self.role_mode {
            Some(mode) => mode,
            None if self.require_all_roles => RoleModeConfig::All,
            None => RoleModeConfig::Any,
        }
    }
}
