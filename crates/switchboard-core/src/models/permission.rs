//! Permission domain model.
//!
//! Permissions form a closed set: every string stored on a role or an
//! exception must parse into a [`Permission`]. Unknown strings are
//! rejected at write time rather than trusted at read time.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SwitchboardError;

/// A single capability, written as `module:action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    DashboardView,
    AgentsView,
    IntelligenceView,
    TenantManage,
    RolesView,
    RolesManage,
    UsersView,
    UsersManage,
    TeamsView,
    TeamsManage,
    EntitiesView,
    EntitiesManage,
    ScreenAssetsView,
    ScreenAssetsManage,
    TransactionsView,
    TransactionsManage,
    AuditView,
}

impl Permission {
    pub const ALL: [Permission; 17] = [
        Permission::DashboardView,
        Permission::AgentsView,
        Permission::IntelligenceView,
        Permission::TenantManage,
        Permission::RolesView,
        Permission::RolesManage,
        Permission::UsersView,
        Permission::UsersManage,
        Permission::TeamsView,
        Permission::TeamsManage,
        Permission::EntitiesView,
        Permission::EntitiesManage,
        Permission::ScreenAssetsView,
        Permission::ScreenAssetsManage,
        Permission::TransactionsView,
        Permission::TransactionsManage,
        Permission::AuditView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::DashboardView => "dashboard:view",
            Permission::AgentsView => "agents:view",
            Permission::IntelligenceView => "intelligence:view",
            Permission::TenantManage => "tenant:manage",
            Permission::RolesView => "roles:view",
            Permission::RolesManage => "roles:manage",
            Permission::UsersView => "users:view",
            Permission::UsersManage => "users:manage",
            Permission::TeamsView => "teams:view",
            Permission::TeamsManage => "teams:manage",
            Permission::EntitiesView => "entities:view",
            Permission::EntitiesManage => "entities:manage",
            Permission::ScreenAssetsView => "screen_assets:view",
            Permission::ScreenAssetsManage => "screen_assets:manage",
            Permission::TransactionsView => "transactions:view",
            Permission::TransactionsManage => "transactions:manage",
            Permission::AuditView => "audit:view",
        }
    }

    /// The module half of `module:action`.
    pub fn module(&self) -> &'static str {
        self.as_str()
            .split_once(':')
            .map(|(module, _)| module)
            .unwrap_or_default()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = SwitchboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SwitchboardError::validation(format!("unknown permission: {s}")))
    }
}

impl TryFrom<String> for Permission {
    type Error = SwitchboardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(p: Permission) -> Self {
        p.as_str().to_string()
    }
}

/// An ordered, duplicate-free set of permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every permission in the closed set.
    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    /// Parse stored strings; any unknown entry fails the whole set.
    pub fn parse<I, S>(values: I) -> Result<Self, SwitchboardError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .map(|s| s.as_ref().parse::<Permission>())
            .collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn remove(&mut self, permission: Permission) -> bool {
        self.0.remove(&permission)
    }

    pub fn extend(&mut self, other: &PermissionSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// String form for storage.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
