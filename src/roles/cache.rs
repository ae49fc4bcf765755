use std::{sync::Arc, time::Duration};

use tracing::trace;

use crate::{
    Result,
    common::MemCache,
    roles::{Role, RoleRegistry},
};

const ROLES_KEY: &str = "roles";

/// Fronts a registry with a time-bounded cache of its role list.
pub struct CachedRoleRegistry {
    inner: Arc<dyn RoleRegistry>,
    cache: MemCache<&'static str, Arc<Vec<Role>>>,
}

impl CachedRoleRegistry {
    pub fn new(
        inner: Arc<dyn RoleRegistry>,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            cache: MemCache::with_ttl(capacity.max(1), ttl),
        }
    }
}

impl RoleRegistry for CachedRoleRegistry {
    fn list_roles(&self) -> Result<Vec<Role>> {
        if let Some(roles) = self.cache.get(&ROLES_KEY) {
            return Ok(roles.as_ref().clone());
        }
        trace!("roles::cache miss");
        // failures are not cached, the next call retries the registry
        let roles = self.inner.list_roles()?;
        self.cache.set(ROLES_KEY, Arc::new(roles.clone()));
        Ok(roles)
    }

    fn refresh(&self) {
        self.cache.clear();
        self.inner.refresh();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::roles::StaticRoleRegistry;

    struct CountingRegistry {
        inner: StaticRoleRegistry,
        calls: AtomicUsize,
    }

    impl RoleRegistry for CountingRegistry {
        fn list_roles(&self) -> Result<Vec<Role>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_roles()
        }
    }

    #[test]
    fn test_cache_hits_until_refresh() {
        let counting = Arc::new(CountingRegistry {
            inner: StaticRoleRegistry::with_ids(["agent"]),
            calls: AtomicUsize::new(0),
        });
        let cached = CachedRoleRegistry::new(counting.clone(), 4, Duration::from_secs(300));

        assert_eq!(cached.list_roles().unwrap().len(), 1);
        assert_eq!(cached.list_roles().unwrap().len(), 1);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

        counting.inner.add(Role::new("approver", "Approver"));
        assert_eq!(cached.list_roles().unwrap().len(), 1);

        cached.refresh();
        assert_eq!(cached.list_roles().unwrap().len(), 2);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }
}
