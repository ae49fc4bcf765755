use std::{fs, path::Path};

use serde::Deserialize;

use crate::Result;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// store config
    #[serde(default)]
    pub store: StoreConfig,
    /// field limits applied by the validator
    #[serde(default)]
    pub validation: ValidationConfig,
    /// role registry caching
    #[serde(default)]
    pub roles: RoleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// store type
    #[serde(default)]
    pub store_type: StoreType,
    /// capacity of the engine event channel, defaults to 1024
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Mem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// max characters in a step or action name, defaults to 64
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
    /// max characters in description/instruction fields, defaults to 256
    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    /// entries kept by the role cache, defaults to 16
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// seconds a fetched role list stays cached; 0 disables caching, defaults to 60
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_event_capacity() -> usize {
    1024
}

fn default_max_name_len() -> usize {
    64
}

fn default_max_description_len() -> usize {
    256
}

fn default_cache_capacity() -> usize {
    16
}

fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_name_len: default_max_name_len(),
            max_description_len: default_max_description_len(),
        }
    }
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use crate::{Config, StoreType, TickflowError};

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        [store]
        store_type = "mem"
        event_capacity = 64

        [validation]
        max_name_len = 32

        [roles]
        cache_ttl_secs = 0
        "#;
        let config = Config::load_from_str(toml_str).unwrap();
        assert_eq!(config.store.store_type, StoreType::Mem);
        assert_eq!(config.store.event_capacity, 64);
        assert_eq!(config.validation.max_name_len, 32);
        assert_eq!(config.validation.max_description_len, 256);
        assert_eq!(config.roles.cache_ttl_secs, 0);
        assert_eq!(config.roles.cache_capacity, 16);
    }

    #[test]
    fn test_config_empty_uses_defaults() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.store.event_capacity, 1024);
        assert_eq!(config.validation.max_name_len, 64);
        assert_eq!(config.roles.cache_ttl_secs, 60);
    }

    #[test]
    fn test_config_rejects_unknown_store() {
        let err = Config::load_from_str("[store]\nstore_type = \"postgres\"\n").unwrap_err();
        assert!(matches!(err, TickflowError::Config(_)));
    }

    #[test]
    fn test_config_missing_file() {
        let err = Config::create("/nonexistent/tickflow.toml").unwrap_err();
        assert!(matches!(err, TickflowError::Config(_)));
    }
}
