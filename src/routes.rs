//! Route registry with matchit.
//!
//! Maps screen path patterns to the roles allowed to enter them. Patterns use
//! matchit syntax: `/assets/{id}` for a parameter, `/reports/{*rest}` for a
//! catch-all.

use matchit::Router;

use crate::error::{Error, Result};
use crate::permission::Role;

/// A registered screen route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub pattern: String,
    /// `None` or an empty list means any authenticated principal may enter.
    pub required_roles: Option<Vec<Role>>,
}

impl Route {
    pub fn required_roles(&self) -> Option<&[Role]> {
        self.required_roles.as_deref()
    }
}

/// Table of screen routes, matched by path.
pub struct RouteTable {
    matcher: Router<usize>,
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            matcher: Router::new(),
            routes: Vec::new(),
        }
    }

    /// Register a route open to every authenticated principal.
    pub fn open(&mut self, pattern: &str) -> Result<&mut Self> {
        self.insert(pattern, None)
    }

    /// Register a route restricted to `roles`.
    pub fn restricted(&mut self, pattern: &str, roles: &[Role]) -> Result<&mut Self> {
        self.insert(pattern, Some(roles.to_vec()))
    }

    fn insert(&mut self, pattern: &str, required_roles: Option<Vec<Role>>) -> Result<&mut Self> {
        let idx = self.routes.len();
        self.matcher
            .insert(pattern, idx)
            .map_err(|e| Error::Config(format!("Invalid route {pattern}: {e}")))?;
        self.routes.push(Route {
            pattern: pattern.to_string(),
            required_roles,
        });
        Ok(self)
    }

    /// Find the route for a navigation target. Query and fragment are ignored.
    pub fn resolve(&self, target: &str) -> Option<&Route> {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        self.matcher
            .at(path)
            .ok()
            .map(|matched| &self.routes[*matched.value])
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}
