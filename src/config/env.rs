//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::AppConfig;

/// Environment variable prefix
const ENV_PREFIX: &str = "TEST_BACKEND";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Config file from TEST_BACKEND_CONFIG
    pub config_file: Option<String>,
    /// Log level from TEST_BACKEND_LOG
    pub log_level: Option<String>,
    /// Settings module from TEST_BACKEND_SETTINGS
    pub settings_module: Option<String>,
    /// Test database name from TEST_BACKEND_DATABASE
    pub database: Option<String>,
    /// Cache address from TEST_BACKEND_CACHE
    pub cache_address: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG"),
            log_level: get_env("LOG"),
            settings_module: get_env("SETTINGS"),
            database: get_env("DATABASE"),
            cache_address: get_env("CACHE"),
        }
    }

    /// Apply overrides on top of file configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(ref module) = self.settings_module {
            config.framework.settings_module = module.clone();
        }
        if let Some(ref database) = self.database {
            config.database.database = database.clone();
        }
        if let Some(ref address) = self.cache_address {
            config.cache.address = address.clone();
        }
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.config_file.is_none());
        assert!(config.database.is_none());
    }

    #[test]
    fn test_empty_value_is_unset() {
        let key = "TEST_BACKEND_EMPTY_CHECK";
        env::set_var(key, "");
        assert!(get_env("EMPTY_CHECK").is_none());
        env::set_var(key, "value");
        assert_eq!(get_env("EMPTY_CHECK").as_deref(), Some("value"));
        env::remove_var(key);
    }

    #[test]
    fn test_apply_overrides() {
        let env = EnvConfig {
            database: Some("other".to_string()),
            cache_address: Some("10.0.0.5:11211".to_string()),
            ..Default::default()
        };
        let mut config = AppConfig::default();
        env.apply(&mut config);
        assert_eq!(config.database.database, "other");
        assert_eq!(config.cache.address, "10.0.0.5:11211");
        assert_eq!(config.framework.settings_module, "zproject.test_settings");
    }
}
