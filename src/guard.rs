//! Route-entry gate.
//!
//! The guard never navigates. It answers with a [`Decision`] and leaves the
//! actual navigation to the caller. Decision order:
//!
//! 1. no principal → redirect to login
//! 2. route without required roles → allow
//! 3. principal's role among the required roles → allow
//! 4. otherwise → redirect to the default authenticated page

use std::sync::Arc;

use tracing::debug;
use url::form_urlencoded;

use crate::auth::{Principal, PrincipalSource};
use crate::config::Routes;
use crate::permission::Role;
use crate::routes::RouteTable;

/// Outcome of a route-entry check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Pure decision over an explicit principal and role requirement.
pub fn decide(
    principal: Option<&Principal>,
    required_roles: Option<&[Role]>,
    routes: &Routes,
) -> Decision {
    let Some(principal) = principal else {
        return Decision::RedirectTo(routes.login_path.clone());
    };
    match required_roles {
        None | Some([]) => Decision::Allow,
        Some(roles) if roles.contains(&principal.role) => Decision::Allow,
        Some(_) => Decision::RedirectTo(routes.default_path.clone()),
    }
}

/// Gates navigation using the current principal.
pub struct NavigationGuard {
    source: Arc<dyn PrincipalSource>,
    routes: Routes,
    table: RouteTable,
}

impl NavigationGuard {
    pub fn new(source: Arc<dyn PrincipalSource>, routes: Routes, table: RouteTable) -> Self {
        Self {
            source,
            routes,
            table,
        }
    }

    /// Decide entry to a route declaring `required_roles`.
    pub fn check(&self, required_roles: Option<&[Role]>) -> Decision {
        let principal = self.source.current_principal();
        decide(principal.as_ref(), required_roles, &self.routes)
    }

    /// Decide entry to `target` by looking its route up in the table.
    ///
    /// Unregistered paths need an authenticated principal but no role.
    /// Redirects to login carry the attempted target as `returnUrl`.
    pub fn check_path(&self, target: &str) -> Decision {
        let route = self.table.resolve(target);
        let principal = self.source.current_principal();
        let decision = decide(
            principal.as_ref(),
            route.and_then(|r| r.required_roles()),
            &self.routes,
        );
        debug!(
            path = target,
            route = route.map(|r| r.pattern.as_str()),
            ?decision,
            "Navigation checked"
        );
        match decision {
            Decision::RedirectTo(path) if principal.is_none() && target != path => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("returnUrl", target)
                    .finish();
                Decision::RedirectTo(format!("{path}?{query}"))
            }
            other => other,
        }
    }
}
