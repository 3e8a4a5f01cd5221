//! Read-only capability queries for a principal snapshot.

use crate::auth::Principal;
use crate::permission::{Capability, PermissionMatrix, Role};

/// Answers "may the current principal do X" against a fixed matrix.
///
/// An authority is a snapshot: it holds a copy of the principal that was
/// current when it was taken. Without a principal every query is `false`.
#[derive(Clone, Debug)]
pub struct RoleAuthority {
    principal: Option<Principal>,
    matrix: &'static PermissionMatrix,
}

impl RoleAuthority {
    /// Snapshot over the standard matrix.
    pub fn new(principal: Option<Principal>) -> Self {
        Self::with_matrix(principal, PermissionMatrix::standard())
    }

    pub fn with_matrix(principal: Option<Principal>, matrix: &'static PermissionMatrix) -> Self {
        Self { principal, matrix }
    }

    /// Authority with no principal; denies everything.
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.principal.as_ref().map(|p| p.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.role()
            .is_some_and(|role| self.matrix.allows(role, cap))
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }

    /// Membership test; an empty `roles` list is never satisfied.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role().is_some_and(|role| roles.contains(&role))
    }
}
