//! Request audit records.
//!
//! # Responsibilities
//! - Capture method, path, query, headers and body of each request
//! - Redact credentials from headers and sensitive keys from JSON bodies
//! - Attach the resolved subject, roles and authorization decision
//! - Emit one JSON record per request on the `audit` tracing target
//!
//! # Design Decisions
//! - Side effect only: auditing never changes a response
//! - Health/probe paths and OPTIONS are skipped by default
//! - Non-JSON bodies are kept as truncated text

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Instant;

use axum::http::{request::Parts, HeaderMap, StatusCode};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::auth::RequestContext;
use crate::config::schema::AuditConfig;
use crate::security::headers::is_sensitive_header;

const REDACTED: &str = "[REDACTED]";
const SENSITIVE_BODY_KEYS: &[&str] = &["password", "token", "secret", "key", "auth"];
const MAX_TEXT_BODY_CHARS: usize = 1000;

/// One audit line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: String,
    pub request_id: Option<String>,
    pub method: String,
    pub url: String,
    pub path: String,
    pub query: BTreeMap<String, Vec<String>>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub user_agent: Option<String>,
    pub ip_address: String,
    pub route: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub roles: Option<Vec<String>>,
    pub decision: Option<&'static str>,
    pub response_status: u16,
    pub response_time: u64,
    pub request_size: u64,
    pub response_size: u64,
    pub error: Option<String>,
}

/// Decides which requests are audited and starts their records.
#[derive(Debug, Clone)]
pub struct AuditSink {
    config: AuditConfig,
}

impl AuditSink {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Largest request body buffered for auditing.
    pub fn max_body_bytes(&self) -> usize {
        self.config.max_body_bytes
    }

    /// Whether a request should produce an audit record.
    pub fn wants(&self, method: &str, path: &str) -> bool {
        self.config.enabled && !should_skip(&self.config, method, path)
    }

    /// Capture the request side of a record.
    pub fn begin(&self, parts: &Parts, body: &[u8], peer: Option<SocketAddr>) -> PendingAudit {
        let query = parts
            .uri
            .query()
            .map(|q| {
                let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
                    map.entry(k.into_owned()).or_default().push(v.into_owned());
                }
                map
            })
            .unwrap_or_default();

        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        PendingAudit {
            started: Instant::now(),
            record: AuditRecord {
                kind: "audit_log",
                timestamp: now_rfc3339(Utc::now()),
                request_id: header_str("x-request-id"),
                method: parts.method.to_string(),
                url: parts.uri.to_string(),
                path: parts.uri.path().to_string(),
                query,
                headers: sanitize_headers(&parts.headers),
                body: sanitize_body(body),
                user_agent: header_str("user-agent"),
                ip_address: client_ip(&parts.headers, peer),
                route: None,
                user_id: None,
                user_name: None,
                roles: None,
                decision: None,
                response_status: 0,
                response_time: 0,
                request_size: body.len() as u64,
                response_size: 0,
                error: None,
            },
        }
    }
}

/// A record waiting for its response.
#[derive(Debug)]
pub struct PendingAudit {
    started: Instant,
    record: AuditRecord,
}

impl PendingAudit {
    /// Complete the record from the request context and response, then emit it.
    pub fn finish(self, ctx: &RequestContext, status: StatusCode, response_size: u64) -> AuditRecord {
        let mut record = self.record;
        let roles = ctx.roles();

        record.route = ctx.route.clone();
        record.user_id = ctx.subject().or(ctx.username()).map(str::to_string);
        record.user_name = ctx.username().map(str::to_string);
        record.roles = (!roles.is_empty()).then_some(roles);
        record.decision = ctx.decision.map(|d| d.as_str());
        record.response_status = status.as_u16();
        record.response_time = self.started.elapsed().as_millis() as u64;
        record.response_size = response_size;
        if status.as_u16() >= 400 {
            record.error = Some(format!("HTTP {}", status.as_u16()));
        }

        emit(&record);
        record
    }
}

fn emit(record: &AuditRecord) {
    match serde_json::to_string(record) {
        Ok(line) => tracing::info!(target: "audit", "{}", line),
        Err(e) => tracing::error!(target: "audit", error = %e, "Failed to serialize audit record"),
    }
}

fn now_rfc3339(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whether the request's method or path prefix is on a skip list.
pub fn should_skip(config: &AuditConfig, method: &str, path: &str) -> bool {
    config.skip_paths.iter().any(|p| path.starts_with(p.as_str()))
        || config.skip_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
}

/// Copy headers, dropping credentials. Repeated headers are comma-joined.
pub fn sanitize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        if is_sensitive_header(name.as_str()) {
            continue;
        }
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}

/// JSON bodies are redacted; anything else is kept as truncated text.
pub fn sanitize_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(json) => Some(redact(json)),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let text = match text.char_indices().nth(MAX_TEXT_BODY_CHARS) {
                Some((cut, _)) => format!("{}...", &text[..cut]),
                None => text.into_owned(),
            };
            Some(Value::String(text))
        }
    }
}

fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let lower = k.to_lowercase();
                    if SENSITIVE_BODY_KEYS.iter().any(|s| lower.contains(s)) {
                        (k, Value::String(REDACTED.to_string()))
                    } else {
                        (k, redact(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

/// Client address: first X-Forwarded-For hop, then X-Real-IP, then the peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(first) = header("x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return first.to_string();
    }
    if let Some(real) = header("x-real-ip").filter(|s| !s.is_empty()) {
        return real.to_string();
    }
    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
