use std::{sync::Arc, time::Duration};

use crate::{
    Config, Engine, Result,
    roles::{CachedRoleRegistry, RoleRegistry, StaticRoleRegistry},
    store::Store,
};

pub struct EngineBuilder {
    config: Config,
    registry: Option<Arc<dyn RoleRegistry>>,
    store: Option<Arc<Store>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            registry: None,
            store: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    /// Source of role ids for validation. Defaults to an empty registry,
    /// under which every step role is unknown.
    pub fn role_registry(
        mut self,
        registry: Arc<dyn RoleRegistry>,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Reuse an initialised store instead of creating one from the config.
    pub fn store(
        mut self,
        store: Arc<Store>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(&self) -> Result<Engine> {
        let registry = self.registry.clone().unwrap_or_else(|| Arc::new(StaticRoleRegistry::default()));
        let registry: Arc<dyn RoleRegistry> = match self.config.roles.cache_ttl_secs {
            0 => registry,
            ttl => Arc::new(CachedRoleRegistry::new(registry, self.config.roles.cache_capacity, Duration::from_secs(ttl))),
        };

        Engine::new(&self.config, registry, self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewStep, NewWorkflow, TickflowError, roles::Role};

    #[test]
    fn test_build_default() {
        let engine = EngineBuilder::new().build().unwrap();
        let workflow = engine.create_workflow(NewWorkflow::new("Onboarding")).unwrap();
        assert_eq!(engine.current_version(&workflow.id).unwrap(), 0);
    }

    #[test]
    fn test_cached_registry_needs_refresh() {
        let registry = Arc::new(StaticRoleRegistry::with_ids(["agent"]));
        let engine = EngineBuilder::new().role_registry(registry.clone()).build().unwrap();
        let wid = engine.create_workflow(NewWorkflow::new("Onboarding")).unwrap().id;
        engine.create_step(&wid, 0, NewStep::new("Intake", "agent").start()).unwrap();

        registry.add(Role::new("hr", "Human resources"));
        let err = engine.create_step(&wid, 1, NewStep::new("Review", "hr")).unwrap_err();
        assert!(matches!(err, TickflowError::Validation(_)));

        engine.refresh_roles();
        assert!(engine.create_step(&wid, 1, NewStep::new("Review", "hr")).is_ok());
    }

    #[test]
    fn test_uncached_registry_sees_changes() {
        let registry = Arc::new(StaticRoleRegistry::with_ids(["agent"]));
        let config = Config::load_from_str("[roles]\ncache_ttl_secs = 0").unwrap();
        let engine = EngineBuilder::new().config(config).role_registry(registry.clone()).build().unwrap();
        let wid = engine.create_workflow(NewWorkflow::new("Onboarding")).unwrap().id;
        engine.create_step(&wid, 0, NewStep::new("Intake", "agent").start()).unwrap();

        registry.add(Role::new("hr", "Human resources"));
        assert!(engine.create_step(&wid, 1, NewStep::new("Review", "hr")).is_ok());
    }
}
