//! Roles, capabilities and the static role → capability matrix.
//!
//! The matrix is a total function: every [`Role`] variant owns exactly one
//! slot in the table, so there is no way to ask for a role the table does not
//! know about. It is built in a `const` context and never mutated.
//!
//! # Example
//!
//! ```
//! use assetdesk::permission::{Capability, PermissionMatrix, Role};
//!
//! let matrix = PermissionMatrix::standard();
//! assert!(matrix.allows(Role::Admin, Capability::ManageSystem));
//! assert!(!matrix.allows(Role::Employee, Capability::ManageUsers));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed set of principal roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    ItSupport,
    Employee,
}

impl Role {
    /// Every role, in table order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::ItSupport, Role::Employee];

    /// Wire name (`ADMIN`, `IT_SUPPORT`, `EMPLOYEE`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::ItSupport => "IT_SUPPORT",
            Role::Employee => "EMPLOYEE",
        }
    }

    const fn index(self) -> usize {
        match self {
            Role::Admin => 0,
            Role::ItSupport => 1,
            Role::Employee => 2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

/// Closed set of named permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    ViewAssets,
    ManageAssets,
    ManageUsers,
    ViewAllIssues,
    ResolveIssues,
    ManageSystem,
    ManageRequests,
    ApproveRequests,
    FulfillRequests,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::ViewAssets,
        Capability::ManageAssets,
        Capability::ManageUsers,
        Capability::ViewAllIssues,
        Capability::ResolveIssues,
        Capability::ManageSystem,
        Capability::ManageRequests,
        Capability::ApproveRequests,
        Capability::FulfillRequests,
    ];

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of capabilities packed into a bitmask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    /// Build a set from a list of capabilities.
    pub const fn of(caps: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < caps.len() {
            bits |= caps[i].bit();
            i += 1;
        }
        CapabilitySet(bits)
    }

    /// The set holding every capability.
    pub const fn all() -> Self {
        Self::of(&Capability::ALL)
    }

    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Capabilities in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |cap| self.contains(*cap))
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        CapabilitySet(iter.into_iter().fold(0, |bits, cap| bits | cap.bit()))
    }
}

/// Immutable role → capability table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionMatrix {
    grants: [CapabilitySet; Role::ALL.len()],
}

static STANDARD: PermissionMatrix = {
    let mut grants = [CapabilitySet::EMPTY; Role::ALL.len()];
    let mut i = 0;
    while i < Role::ALL.len() {
        let role = Role::ALL[i];
        grants[role.index()] = standard_grants(role);
        i += 1;
    }
    PermissionMatrix { grants }
};

/// Grants shipped with the console.
const fn standard_grants(role: Role) -> CapabilitySet {
    use Capability::*;
    match role {
        Role::Admin => CapabilitySet::all(),
        Role::ItSupport => CapabilitySet::of(&[
            ViewAssets,
            ManageAssets,
            ViewAllIssues,
            ResolveIssues,
            ManageRequests,
            FulfillRequests,
        ]),
        Role::Employee => CapabilitySet::of(&[ViewAssets]),
    }
}

impl PermissionMatrix {
    /// The process-wide matrix.
    pub fn standard() -> &'static PermissionMatrix {
        &STANDARD
    }

    /// Build a matrix by asking `grants` for every role.
    ///
    /// `grants` is total over [`Role`], so the resulting table has no holes.
    pub fn build(grants: impl Fn(Role) -> CapabilitySet) -> Self {
        let mut table = [CapabilitySet::EMPTY; Role::ALL.len()];
        for role in Role::ALL {
            table[role.index()] = grants(role);
        }
        Self { grants: table }
    }

    /// Full capability set for `role`.
    pub fn capabilities(&self, role: Role) -> CapabilitySet {
        self.grants[role.index()]
    }

    pub fn allows(&self, role: Role, cap: Capability) -> bool {
        self.capabilities(role).contains(cap)
    }
}
