//! Token introspection client.
//!
//! # Responsibilities
//! - POST a bearer credential to the introspection authority (form encoded)
//! - Bound every call by the configured timeout
//! - Parse the authority's answer into an immutable `IntrospectionResult`
//! - Merge realm and resource role lists into one deduplicated role set
//!
//! # Design Decisions
//! - No retries: one attempt per request keeps latency predictable
//! - Non-2xx, timeouts, transport and parse failures are distinct errors,
//!   all treated as "unauthenticated" by callers

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;

use crate::config::schema::IntrospectionConfig;
use crate::observability::metrics;

/// Role names held by a subject.
pub type RoleSet = BTreeSet<String>;

/// Errors from a single introspection call.
#[derive(Debug, Error)]
pub enum IntrospectionError {
    /// Connection or protocol failure talking to the authority.
    #[error("introspection request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The authority did not answer within the configured timeout.
    #[error("introspection timed out after {0:?}")]
    Timeout(Duration),

    /// The authority answered with a non-success status.
    #[error("introspection failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a valid introspection document.
    #[error("failed to parse introspection response: {0}")]
    Parse(#[source] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
struct RoleList {
    #[serde(default)]
    roles: Vec<String>,
}

/// Wire format of the authority's response.
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(default)]
    realm_access: Option<RoleList>,
    #[serde(default)]
    resource_access: Option<HashMap<String, RoleList>>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// Outcome of introspecting a credential. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntrospectionResult {
    active: bool,
    roles: RoleSet,
    expires_at: Option<i64>,
    subject: Option<String>,
    username: Option<String>,
}

impl IntrospectionResult {
    pub fn new(active: bool, roles: RoleSet, expires_at: Option<i64>, subject: Option<String>) -> Self {
        Self {
            active,
            roles,
            expires_at,
            subject,
            username: None,
        }
    }

    /// Parse an authority response body.
    pub fn from_json(body: &[u8]) -> Result<Self, IntrospectionError> {
        let response: IntrospectionResponse =
            serde_json::from_slice(body).map_err(IntrospectionError::Parse)?;
        Ok(Self::from_response(response))
    }

    /// Whether the authority considers the credential currently valid.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Union of realm and resource roles.
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Credential expiry as a unix timestamp, if the authority reported one.
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn from_response(response: IntrospectionResponse) -> Self {
        let mut roles = RoleSet::new();
        if let Some(realm) = response.realm_access {
            roles.extend(realm.roles);
        }
        for (_, access) in response.resource_access.unwrap_or_default() {
            roles.extend(access.roles);
        }

        Self {
            active: response.active,
            roles,
            // Keycloak reports 0 for "no expiry"
            expires_at: response.exp.filter(|exp| *exp > 0),
            subject: response.sub.filter(|s| !s.is_empty()),
            username: response.username.filter(|s| !s.is_empty()),
        }
    }
}

/// HTTP client for the introspection endpoint.
#[derive(Debug, Clone)]
pub struct IntrospectionClient {
    http: reqwest::Client,
    url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
}

impl IntrospectionClient {
    /// Create a client with a pooled connection set.
    pub fn new(config: &IntrospectionConfig) -> Result<Self, IntrospectionError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .build()
            .map_err(IntrospectionError::Transport)?;

        Ok(Self {
            http,
            url: config.url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            timeout,
        })
    }

    /// Ask the authority about `token`.
    pub async fn introspect(&self, token: &str) -> Result<IntrospectionResult, IntrospectionError> {
        let start = Instant::now();
        let result = self.call(token).await;

        let outcome = match &result {
            Ok(r) if r.is_active() => "active",
            Ok(_) => "inactive",
            Err(IntrospectionError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        metrics::record_introspection(outcome, start);

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Token introspection failed");
        }
        result
    }

    async fn call(&self, token: &str) -> Result<IntrospectionResult, IntrospectionError> {
        let form = [
            ("token", token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(IntrospectionError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        IntrospectionResult::from_json(&body)
    }

    fn classify(&self, err: reqwest::Error) -> IntrospectionError {
        if err.is_timeout() {
            IntrospectionError::Timeout(self.timeout)
        } else {
            IntrospectionError::Transport(err)
        }
    }
}
