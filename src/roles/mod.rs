//! Role references and the external registry they are resolved against.
//!
//! The engine never owns role lifecycle. It only asks a [`RoleRegistry`] which
//! role ids exist so the validator can reject steps assigned to unknown roles.

mod cache;

use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Result;

pub use cache::CachedRoleRegistry;

/// A role as listed by the registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role {
    pub id: String,
    pub name: String,
}

impl Role {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Read-only source of roles.
pub trait RoleRegistry: Send + Sync {
    /// Lists every role currently defined.
    fn list_roles(&self) -> Result<Vec<Role>>;

    /// Drops any cached state so the next `list_roles` sees fresh data.
    fn refresh(&self) {}
}

/// Set of role ids known at validation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(HashSet<String>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roles(roles: &[Role]) -> Self {
        Self(roles.iter().map(|r| r.id.clone()).collect())
    }

    /// Resolves the registry, degrading to an empty set when it fails so that
    /// every assigned role is reported as unknown instead of aborting.
    pub fn resolve(registry: &dyn RoleRegistry) -> Self {
        match registry.list_roles() {
            Ok(roles) => Self::from_roles(&roles),
            Err(err) => {
                warn!(error = %err, "role registry unavailable, treating all roles as unknown");
                Self::default()
            }
        }
    }

    pub fn contains(
        &self,
        role: &str,
    ) -> bool {
        self.0.contains(role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for RoleSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(String::from).collect())
    }
}

/// In-memory registry, used as the default and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleRegistry {
    roles: Arc<RwLock<Vec<Role>>>,
}

impl StaticRoleRegistry {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles: Arc::new(RwLock::new(roles)),
        }
    }

    /// Registry whose role ids and names are the same strings.
    pub fn with_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(ids.into_iter().map(|id| Role::new(id, id)).collect())
    }

    pub fn add(
        &self,
        role: Role,
    ) {
        let mut roles = self.roles.write().unwrap_or_else(PoisonError::into_inner);
        roles.retain(|r| r.id != role.id);
        roles.push(role);
    }

    pub fn remove(
        &self,
        id: &str,
    ) {
        let mut roles = self.roles.write().unwrap_or_else(PoisonError::into_inner);
        roles.retain(|r| r.id != id);
    }
}

impl RoleRegistry for StaticRoleRegistry {
    fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.roles.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TickflowError;

    struct DownRegistry;

    impl RoleRegistry for DownRegistry {
        fn list_roles(&self) -> Result<Vec<Role>> {
            Err(TickflowError::Registry("connection refused".into()))
        }
    }

    #[test]
    fn test_static_registry_add_remove() {
        let registry = StaticRoleRegistry::with_ids(["agent", "approver"]);
        registry.add(Role::new("auditor", "Auditor"));
        registry.remove("agent");

        let set = RoleSet::resolve(&registry);
        assert!(set.contains("approver"));
        assert!(set.contains("auditor"));
        assert!(!set.contains("agent"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_resolve_degrades_to_empty() {
        let set = RoleSet::resolve(&DownRegistry);
        assert!(set.is_empty());
    }

    #[test]
    fn test_role_set_matches_ids_not_names() {
        let set = RoleSet::from_roles(&[Role::new("r-1", "Agent")]);
        assert!(set.contains("r-1"));
        assert!(!set.contains("Agent"));
    }
}
