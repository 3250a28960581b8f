//! Route and rule model.
//!
//! # Responsibilities
//! - Hold the compiled, immutable form of each configured route
//! - Normalize rule methods for comparison
//! - Compute the upstream target and forwarded path for a route
//!
//! # Design Decisions
//! - Built once at startup from validated config; never mutated afterwards
//! - Path patterns always match case-insensitively
//! - All method/role/auth policy lives on rules, never on the route itself

use axum::http::uri::{Authority, Scheme};
use regex::{Regex, RegexBuilder};
use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::{RoleModeConfig, RouteConfig, RuleConfig};
use crate::config::validation::ValidationError;

/// How a rule's required roles combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleMode {
    /// Subject must hold every required role.
    All,
    /// Subject must hold at least one required role.
    Any,
}

impl From<RoleModeConfig> for RoleMode {
    fn from(mode: RoleModeConfig) -> Self {
        match mode {
            RoleModeConfig::All => RoleMode::All,
            RoleModeConfig::Any => RoleMode::Any,
        }
    }
}

/// A method-scoped authorization policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Uppercased method names.
    methods: Vec<String>,
    require_auth: bool,
    required_roles: Vec<String>,
    role_mode: RoleMode,
}

impl Rule {
    /// Build a rule directly. Methods are uppercased.
    pub fn new<M, R>(methods: M, require_auth: bool, required_roles: R, role_mode: RoleMode) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            methods: methods
                .into_iter()
                .map(|m| m.as_ref().to_ascii_uppercase())
                .collect(),
            require_auth,
            required_roles: required_roles.into_iter().map(Into::into).collect(),
            role_mode,
        }
    }

    fn from_config(config: &RuleConfig) -> Self {
        Self::new(
            &config.methods,
            config.requires_auth(),
            config.required_roles.iter().cloned(),
            config.effective_role_mode().into(),
        )
    }

    /// Whether this rule applies to `method`.
    ///
    /// An empty method set matches anything; validation never produces one.
    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn requires_auth(&self) -> bool {
        self.require_auth
    }

    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }

    pub fn role_mode(&self) -> RoleMode {
        self.role_mode
    }
}

/// Where allowed requests for a route are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub scheme: Scheme,
    pub authority: Authority,
    /// Path of the upstream URL without a trailing slash ("" for the root).
    pub base_path: String,
}

impl UpstreamTarget {
    /// Parse an absolute `http://` upstream URL.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let url = Url::parse(raw).map_err(|e| e.to_string())?;
        if url.scheme() != "http" {
            return Err(format!("unsupported scheme '{}'", url.scheme()));
        }
        let host = url.host_str().ok_or_else(|| "missing host".to_string())?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }
}

/// A configured route: path pattern, upstream, and ordered rules.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    pattern: Regex,
    upstream: UpstreamTarget,
    strip_prefix: Option<String>,
    rules: Vec<Rule>,
}

impl Route {
    /// Build a route from parts. The pattern is compiled case-insensitively.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        upstream: UpstreamTarget,
        strip_prefix: Option<String>,
        rules: Vec<Rule>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: compile_pattern(pattern)?,
            upstream,
            strip_prefix: strip_prefix.filter(|p| !p.is_empty()),
            rules,
        })
    }

    /// Compile the route at `index` of the validated config.
    pub fn from_config(index: usize, config: &RouteConfig) -> Result<Self, ConfigError> {
        let upstream = UpstreamTarget::parse(&config.upstream).map_err(|message| {
            ConfigError::Validation(vec![ValidationError {
                field: format!("routes[{}].upstream", index),
                message,
            }])
        })?;
        if config.rules.is_empty() {
            return Err(ConfigError::Validation(vec![ValidationError {
                field: format!("routes[{}]", index),
                message: "routes must define at least one rules entry".to_string(),
            }]));
        }

        let rules = config.rules.iter().map(Rule::from_config).collect();
        Self::new(
            config.name.clone(),
            &config.path_pattern,
            upstream,
            config.strip_prefix.clone(),
            rules,
        )
        .map_err(|source| ConfigError::Pattern { index, source })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn upstream(&self) -> &UpstreamTarget {
        &self.upstream
    }

    pub fn strip_prefix(&self) -> Option<&str> {
        self.strip_prefix.as_deref()
    }

    /// Whether the request path matches this route's pattern.
    pub fn matches_path(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// Path sent upstream: the configured prefix is stripped (if present),
    /// then the upstream's base path is prepended.
    pub fn forward_path(&self, path: &str) -> String {
        let stripped = match &self.strip_prefix {
            Some(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some("") => "/",
                Some(rest) if rest.starts_with('/') => rest,
                Some(rest) => return format!("{}/{}", self.upstream.base_path, rest),
                None => path,
            },
            None => path,
        };
        format!("{}{}", self.upstream.base_path, stripped)
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
