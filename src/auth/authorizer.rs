//! Per-request authorization pipeline.
//!
//! # Data Flow
//! ```text
//! RouteMatch (method-matching rules)
//!     → any public rule?            yes → Allow, no credential check
//!     → bearer credential present?  no  → Unauthenticated
//!     → CredentialResolver::resolve (cache → authority)
//!         error / inactive          → Unauthenticated
//!     → engine::authorize (first satisfied rule)
//!         none satisfied            → Forbidden
//! ```

use std::sync::Arc;

use crate::auth::engine::{self, Decision};
use crate::auth::introspection::IntrospectionResult;
use crate::auth::resolver::CredentialResolver;
use crate::error::{AuthFailure, GatewayError, GatewayResult};
use crate::observability::metrics;
use crate::routing::RouteMatch;

/// Request-scoped state threaded explicitly through the handler.
///
/// Filled in as the request moves through the pipeline and read by the
/// audit sink at the end.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Name of the matched route.
    pub route: Option<String>,
    /// Resolved identity, when a credential was checked.
    pub identity: Option<Arc<IntrospectionResult>>,
    /// Final authorization decision, when one was reached.
    pub decision: Option<Decision>,
}

impl RequestContext {
    pub fn subject(&self) -> Option<&str> {
        self.identity.as_deref().and_then(IntrospectionResult::subject)
    }

    pub fn username(&self) -> Option<&str> {
        self.identity.as_deref().and_then(IntrospectionResult::username)
    }

    /// Roles of the resolved identity, sorted.
    pub fn roles(&self) -> Vec<String> {
        self.identity
            .as_deref()
            .map(|i| i.roles().iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Combines credential resolution with the decision engine.
#[derive(Clone)]
pub struct Authorizer {
    resolver: CredentialResolver,
}

impl Authorizer {
    pub fn new(resolver: CredentialResolver) -> Self {
        Self { resolver }
    }

    /// Authorize a matched request, recording identity and decision in `ctx`.
    pub async fn authorize(
        &self,
        matched: &RouteMatch<'_>,
        credential: Option<&str>,
        ctx: &mut RequestContext,
    ) -> GatewayResult<()> {
        let route = matched.route.name();
        ctx.route = Some(route.to_string());

        let decision = self.decide(matched, credential, ctx).await;
        metrics::record_auth_decision(match &decision {
            Ok(d) => d.as_str(),
            Err(_) => Decision::Unauthenticated.as_str(),
        });

        let decision = decision?;
        ctx.decision = Some(decision);
        match decision {
            Decision::Allow { rule } => {
                tracing::debug!(route, rule, subject = ctx.subject().unwrap_or("-"), "Request authorized");
                Ok(())
            }
            Decision::Unauthenticated => Err(AuthFailure::Inactive.into()),
            Decision::Forbidden => {
                tracing::info!(
                    route,
                    subject = ctx.subject().unwrap_or("-"),
                    "Insufficient roles"
                );
                Err(GatewayError::Forbidden {
                    route: route.to_string(),
                })
            }
        }
    }

    async fn decide(
        &self,
        matched: &RouteMatch<'_>,
        credential: Option<&str>,
        ctx: &mut RequestContext,
    ) -> Result<Decision, AuthFailure> {
        if let Some(rule) = engine::public_rule(&matched.rules) {
            return Ok(Decision::Allow { rule });
        }

        let Some(token) = credential else {
            ctx.decision = Some(Decision::Unauthenticated);
            return Err(AuthFailure::MissingCredential);
        };

        let identity = match self.resolver.resolve(token).await {
            Ok(identity) => identity,
            Err(e) => {
                ctx.decision = Some(Decision::Unauthenticated);
                return Err(e.into());
            }
        };
        if !identity.is_active() {
            ctx.decision = Some(Decision::Unauthenticated);
            return Err(AuthFailure::Inactive);
        }

        let decision = engine::authorize(&matched.rules, Some(&identity));
        ctx.identity = Some(identity);
        Ok(decision)
    }
}
