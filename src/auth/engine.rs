//! Authorization decisions.
//!
//! # Responsibilities
//! - Decide allow / unauthenticated / forbidden for a set of matched rules
//! - Evaluate a rule's required roles under its ALL/ANY mode
//!
//! # Design Decisions
//! - OR across rules: the request is allowed if any matched rule is satisfied
//! - A public rule among the matches allows the request without a credential
//! - Protected rules are checked in order; the first satisfied one wins
//! - Pure functions: no I/O, no shared state

use crate::auth::introspection::{IntrospectionResult, RoleSet};
use crate::routing::rule::{RoleMode, Rule};

/// Outcome of evaluating matched rules against an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Allowed by the rule at this index of the matched rules.
    Allow { rule: usize },
    /// A credential is required but absent or inactive.
    Unauthenticated,
    /// Authenticated, but no rule's role requirement is met.
    Forbidden,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow { .. } => "allow",
            Decision::Unauthenticated => "unauthenticated",
            Decision::Forbidden => "forbidden",
        }
    }
}

/// Index of the first matched rule that does not require authentication.
pub fn public_rule(rules: &[&Rule]) -> Option<usize> {
    rules.iter().position(|rule| !rule.requires_auth())
}

/// Whether `roles` satisfies the rule's required roles.
///
/// An empty requirement is satisfied by any authenticated subject.
pub fn roles_satisfied(rule: &Rule, roles: &RoleSet) -> bool {
    let required = rule.required_roles();
    if required.is_empty() {
        return true;
    }
    match rule.role_mode() {
        RoleMode::All => required.iter().all(|r| roles.contains(r.as_str())),
        RoleMode::Any => required.iter().any(|r| roles.contains(r.as_str())),
    }
}

/// Decide whether a request may proceed.
///
/// `identity` is the resolved introspection result, if a credential was
/// presented and resolved. It is not consulted when a public rule matched.
pub fn authorize(rules: &[&Rule], identity: Option<&IntrospectionResult>) -> Decision {
    if let Some(rule) = public_rule(rules) {
        return Decision::Allow { rule };
    }

    let Some(identity) = identity.filter(|i| i.is_active()) else {
        return Decision::Unauthenticated;
    };

    rules
        .iter()
        .position(|rule| roles_satisfied(rule, identity.roles()))
        .map_or(Decision::Forbidden, |rule| Decision::Allow { rule })
}
