//! End-to-end tests: gateway on a real socket, wiremock as the
//! introspection authority, a raw TCP echo server as the upstream.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{start_echo_backend, start_gateway, unused_addr};

fn gateway_config(authority: &str, upstream: SocketAddr, cache_enabled: bool) -> String {
    format!(
        r#"
        [server]
        request_timeout_secs = 5

        [introspection]
        url = "{authority}/realms/test/protocol/openid-connect/token/introspect"
        client_id = "gateway"
        client_secret = "s3cret"
        timeout_ms = 2000

        [cache]
        enabled = {cache_enabled}
        ttl_secs = 60

        [[routes]]
        name = "public"
        path_pattern = "^/public"
        upstream = "http://{upstream}"
        strip_prefix = "/public"

          [[routes.rules]]
          methods = ["GET", "POST"]
          require_auth = false

        [[routes]]
        name = "admin"
        path_pattern = "^/admin"
        upstream = "http://{upstream}"

          [[routes.rules]]
          methods = ["GET"]
          required_roles = ["admin", "auditor"]
          role_mode = "all"

          [[routes.rules]]
          methods = ["DELETE"]
          required_roles = ["admin"]

        [[routes]]
        name = "reports"
        path_pattern = "^/reports"
        upstream = "http://{upstream}/v1"

          [[routes.rules]]
          methods = ["GET", "POST"]
          required_roles = ["viewer", "editor"]

        [[routes]]
        name = "me"
        path_pattern = "^/me$"
        upstream = "http://{upstream}"

          [[routes.rules]]
          methods = ["GET"]
        "#
    )
}

async fn mount_token(authority: &MockServer, token: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/realms/test/protocol/openid-connect/token/introspect"))
        .and(body_string_contains(format!("token={}", token)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(authority)
        .await;
}

async fn mount_standard_tokens(authority: &MockServer) {
    mount_token(
        authority,
        "admin-token",
        json!({
            "active": true,
            "sub": "u-admin",
            "username": "root",
            "realm_access": {"roles": ["admin"]},
            "resource_access": {"console": {"roles": ["auditor"]}}
        }),
    )
    .await;
    mount_token(
        authority,
        "half-admin-token",
        json!({"active": true, "sub": "u-half", "realm_access": {"roles": ["admin"]}}),
    )
    .await;
    mount_token(
        authority,
        "viewer-token",
        json!({"active": true, "sub": "u-viewer", "realm_access": {"roles": ["viewer"]}}),
    )
    .await;
    mount_token(authority, "revoked-token", json!({"active": false})).await;
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_public_route_forwards_without_credential() {
    let authority = MockServer::start().await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client()
        .get(gateway.url("/public/users/7?expand=roles"))
        .header("host", "api.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let echoed = response.text().await.unwrap().to_lowercase();
    assert!(echoed.starts_with("get /users/7?expand=roles http/1.1"), "{}", echoed);
    assert!(echoed.contains("x-forwarded-for: 127.0.0.1"));
    assert!(echoed.contains("x-forwarded-proto: http"));
    assert!(echoed.contains("x-forwarded-host: api.example.com"));
    assert!(echoed.contains("x-request-id: "));
    assert!(authority.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_strip_prefix_to_root() {
    let authority = MockServer::start().await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client().get(gateway.url("/public")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let echoed = response.text().await.unwrap();
    assert!(echoed.starts_with("GET / HTTP/1.1"), "{}", echoed);
}

#[tokio::test]
async fn test_request_body_reaches_upstream() {
    let authority = MockServer::start().await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client()
        .post(gateway.url("/public/forms"))
        .json(&json!({"name": "widget", "password": "hunter2"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let echoed = response.text().await.unwrap();
    // Redaction applies to the audit record only; the upstream sees the original body
    assert!(echoed.contains(r#""password":"hunter2""#), "{}", echoed);
}

#[tokio::test]
async fn test_missing_or_malformed_credential_is_unauthorized() {
    let authority = MockServer::start().await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client().get(gateway.url("/reports")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");

    let response = client()
        .get(gateway.url("/reports"))
        .header("authorization", "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(authority.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_inactive_credential_is_unauthorized() {
    let authority = MockServer::start().await;
    mount_standard_tokens(&authority).await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client()
        .get(gateway.url("/me"))
        .bearer_auth("revoked-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.text().await.unwrap(), "Unauthorized");
}

#[tokio::test]
async fn test_any_mode_allows_single_matching_role() {
    let authority = MockServer::start().await;
    mount_standard_tokens(&authority).await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client()
        .get(gateway.url("/reports/2024"))
        .bearer_auth("viewer-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let echoed = response.text().await.unwrap();
    // Upstream base path is prepended; no prefix stripping on this route
    assert!(echoed.starts_with("GET /v1/reports/2024 HTTP/1.1"), "{}", echoed);
}

#[tokio::test]
async fn test_all_mode_requires_every_role() {
    let authority = MockServer::start().await;
    mount_standard_tokens(&authority).await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client()
        .get(gateway.url("/admin/settings"))
        .bearer_auth("admin-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client()
        .get(gateway.url("/admin/settings"))
        .bearer_auth("half-admin-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response.text().await.unwrap();
    assert_eq!(body, "Insufficient permissions");
    assert!(!body.contains("auditor"));

    // DELETE only needs "admin"
    let response = client()
        .delete(gateway.url("/admin/settings"))
        .bearer_auth("half-admin-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_authenticated_rule_without_roles() {
    let authority = MockServer::start().await;
    mount_standard_tokens(&authority).await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client()
        .get(gateway.url("/me"))
        .bearer_auth("viewer-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let echoed = response.text().await.unwrap().to_lowercase();
    assert!(echoed.contains("authorization: bearer viewer-token"));
}

#[tokio::test]
async fn test_unmatched_path_and_method_are_not_found() {
    let authority = MockServer::start().await;
    mount_standard_tokens(&authority).await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client().get(gateway.url("/unknown")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "Route not found");

    let response = client()
        .put(gateway.url("/reports"))
        .bearer_auth("viewer-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(authority.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_path_matching_is_case_insensitive() {
    let authority = MockServer::start().await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client().get(gateway.url("/PUBLIC/Health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cached_credential_skips_authority() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "active": true,
            "sub": "u-1",
            "realm_access": {"roles": ["editor"]}
        })))
        .expect(1)
        .mount(&authority)
        .await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    for _ in 0..3 {
        let response = client()
            .get(gateway.url("/reports"))
            .bearer_auth("cached-token")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_disabled_cache_introspects_every_request() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "active": true,
            "realm_access": {"roles": ["editor"]}
        })))
        .expect(2)
        .mount(&authority)
        .await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, false)).await;

    for _ in 0..2 {
        let response = client()
            .get(gateway.url("/reports"))
            .bearer_auth("uncached-token")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_authority_failure_is_unauthorized() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal detail"))
        .mount(&authority)
        .await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let response = client()
        .get(gateway.url("/reports"))
        .bearer_auth("any-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!response.text().await.unwrap().contains("internal detail"));
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let authority = MockServer::start().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), unused_addr(), true)).await;

    let response = client().get(gateway.url("/public/x")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_env_placeholders_in_config_file() {
    let authority = MockServer::start().await;
    mount_standard_tokens(&authority).await;
    let upstream = start_echo_backend().await;

    std::env::set_var("GATEWAY_TEST_REPORTS_ROLE", "viewer");
    let config = gateway_config(&authority.uri(), upstream, true).replace(
        r#"required_roles = ["viewer", "editor"]"#,
        r#"required_roles = ["${GATEWAY_TEST_REPORTS_ROLE}", "${GATEWAY_TEST_UNSET_ROLE:-auditor}"]"#,
    );
    let gateway = start_gateway(&config).await;

    let response = client()
        .get(gateway.url("/reports"))
        .bearer_auth("viewer-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let authority = MockServer::start().await;
    let upstream = start_echo_backend().await;
    let gateway = start_gateway(&gateway_config(&authority.uri(), upstream, true)).await;

    let url = gateway.url("/public");
    let response = client().get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    gateway.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), gateway.handle)
        .await
        .expect("server did not stop");
    assert!(result.unwrap().is_ok());

    assert!(client().get(&url).send().await.is_err());
}
