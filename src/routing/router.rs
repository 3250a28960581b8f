//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in configuration order
//! - Look up the first route whose pattern and rule methods match a request
//! - Return the matched route plus its method-matching rules, or no match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan: configuration order is the priority order
//! - A path match with no method-matching rule falls through to later routes
//!   and, if nothing else matches, is reported as no match (404, not 405)

use crate::config::loader::ConfigError;
use crate::config::schema::RouteConfig;
use crate::routing::rule::{Route, Rule};

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Rules whose method set contains the request method, in rule order.
    pub rules: Vec<&'a Rule>,
}

/// Ordered, immutable route table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Compile every configured route, failing on the first bad one.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, ConfigError> {
        let routes = routes
            .iter()
            .enumerate()
            .map(|(i, r)| Route::from_config(i, r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(routes))
    }

    /// Find the first route matching `path` with at least one rule for `method`.
    pub fn match_request(&self, path: &str, method: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            if !route.matches_path(path) {
                return None;
            }
            let rules: Vec<&Rule> = route
                .rules()
                .iter()
                .filter(|rule| rule.allows_method(method))
                .collect();
            if rules.is_empty() {
                tracing::trace!(route = %route.name(), method, "Path matched but no rule for method");
                return None;
            }
            Some(RouteMatch { route, rules })
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rule::{RoleMode, UpstreamTarget};

    fn route(name: &str, pattern: &str, rules: Vec<Rule>) -> Route {
        Route::new(
            name,
            pattern,
            UpstreamTarget::parse("http://upstream:8080").unwrap(),
            None,
            rules,
        )
        .unwrap()
    }

    fn protected(methods: &[&str], roles: &[&str]) -> Rule {
        Rule::new(methods, true, roles.iter().copied(), RoleMode::Any)
    }

    fn public(methods: &[&str]) -> Rule {
        Rule::new(methods, false, Vec::<String>::new(), RoleMode::Any)
    }

    #[test]
    fn test_match_returns_method_matching_rules_in_order() {
        let router = Router::new(vec![route(
            "users",
            "^/api/users",
            vec![
                protected(&["GET"], &["reader"]),
                protected(&["POST"], &["writer"]),
                public(&["GET"]),
            ],
        )]);

        let m = router.match_request("/api/users", "GET").unwrap();
        assert_eq!(m.route.name(), "users");
        assert_eq!(m.rules.len(), 2);
        assert_eq!(m.rules[0].required_roles(), ["reader"]);
        assert!(!m.rules[1].requires_auth());

        let m = router.match_request("/api/users", "post").unwrap();
        assert_eq!(m.rules.len(), 1);
        assert_eq!(m.rules[0].required_roles(), ["writer"]);
    }

    #[test]
    fn test_no_match_on_path() {
        let router = Router::new(vec![route("users", "^/api/users", vec![public(&["GET"])])]);
        assert!(router.match_request("/api/orders", "GET").is_none());
    }

    #[test]
    fn test_no_match_when_method_not_allowed() {
        let router = Router::new(vec![route("users", "^/api/users", vec![public(&["GET"])])]);
        assert!(router.match_request("/api/users", "DELETE").is_none());
    }

    #[test]
    fn test_method_miss_falls_through_to_later_route() {
        let router = Router::new(vec![
            route("read", "^/api/", vec![public(&["GET"])]),
            route("write", "^/api/", vec![protected(&["POST"], &[])]),
        ]);
        assert_eq!(router.match_request("/api/x", "GET").unwrap().route.name(), "read");
        assert_eq!(router.match_request("/api/x", "POST").unwrap().route.name(), "write");
    }

    #[test]
    fn test_first_route_wins() {
        let router = Router::new(vec![
            route("specific", "^/api/users/me$", vec![public(&["GET"])]),
            route("general", "^/api/users", vec![public(&["GET"])]),
        ]);
        assert_eq!(
            router.match_request("/api/users/me", "GET").unwrap().route.name(),
            "specific"
        );
        assert_eq!(
            router.match_request("/api/users/7", "GET").unwrap().route.name(),
            "general"
        );
    }

    #[test]
    fn test_case_insensitive_path() {
        let router = Router::new(vec![route("users", "^/api/users$", vec![public(&["GET"])])]);
        assert!(router.match_request("/API/USERS", "GET").is_some());
    }

    #[test]
    fn test_from_config() {
        let routes: Vec<RouteConfig> = vec![toml::from_str(
            r#"
            name = "reports"
            path_pattern = "^/reports"
            upstream = "http://reports:9000"

            [[rules]]
            methods = ["get", "post"]
            required_roles = ["viewer", "editor"]
            "#,
        )
        .unwrap()];

        let router = Router::from_config(&routes).unwrap();
        assert_eq!(router.len(), 1);
        let m = router.match_request("/reports", "POST").unwrap();
        assert_eq!(m.rules[0].role_mode(), RoleMode::Any);
    }
}
