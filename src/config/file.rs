//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{AppConfig, EnvConfig};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./test-backend.yaml",
    "./test-backend.yml",
    "./.test-backend.yaml",
    "~/.config/test-backend/config.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(flatten)]
    pub app: AppConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path wins over `TEST_BACKEND_CONFIG`, which wins over the
    /// search locations. Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<AppConfig> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.as_ref().map(PathBuf::from))
            .or_else(Self::find);

        let mut file = match path {
            Some(path) => Self::load(&path)?,
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };
        env.apply(&mut file.app);
        file.validate()?;
        Ok(file.app)
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        debug!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        let framework = &self.app.framework;
        if framework.runner_program.trim().is_empty() {
            anyhow::bail!("framework.runner_program must not be empty");
        }
        if framework.default_suite.trim().is_empty() {
            anyhow::bail!("framework.default_suite must not be empty");
        }

        let database = &self.app.database;
        if database.database.trim().is_empty() {
            anyhow::bail!("database.database must not be empty");
        }
        if database.database == database.maintenance_database {
            anyhow::bail!(
                "database.database '{}' must differ from the maintenance database",
                database.database
            );
        }
        for name in [&database.app_role, &database.admin_role, &database.schema] {
            if !is_identifier(name) {
                anyhow::bail!("Invalid SQL identifier in database config: '{name}'");
            }
        }
        for name in database
            .extensions
            .iter()
            .chain(&database.search_path)
            .chain(&database.related_databases)
            .chain(std::iter::once(&database.database))
        {
            if !is_identifier(name) {
                anyhow::bail!("Invalid SQL identifier in database config: '{name}'");
            }
        }

        Ok(())
    }
}

/// Plain lowercase SQL identifiers only; they are interpolated unquoted
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml_keeps_unset_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "version: \"1.0\"\ndatabase:\n  database: zulip_ci\n").unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.app.database.database, "zulip_ci");
        assert_eq!(loaded.app.framework.runner_program, "./manage.py");
    }

    #[test]
    fn test_flat_sections_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "version: \"1.0\"\nfixtures:\n  failure_policy: abort\ncoverage:\n  html_dir: out/html\n",
        )
        .unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.app.fixtures.failure_policy, FailurePolicy::Abort);
        assert_eq!(loaded.app.coverage.html_dir, PathBuf::from("out/html"));
    }

    #[test]
    fn test_json_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"framework": {"default_suite": "analytics.tests"}}"#).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.app.framework.default_suite, "analytics.tests");
    }

    #[test]
    fn test_validate_rejects_bad_version() {
        let config = ConfigFile {
            version: "9.9".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_injected_identifier() {
        let mut config = ConfigFile::default();
        config.app.database.database = "zulip; DROP ROLE postgres".to_string();
        assert!(config.validate().is_err());

        let mut config = ConfigFile::default();
        config.app.database.extensions.push("Bad-Ext".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_runner() {
        let mut config = ConfigFile::default();
        config.app.framework.runner_program = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_explicit_path_and_env_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "database:\n  database: from_file\n").unwrap();

        let env = EnvConfig {
            settings_module: Some("zproject.ci_settings".to_string()),
            ..Default::default()
        };
        let app = ConfigFile::resolve(Some(&path), &env).unwrap();
        assert_eq!(app.database.database, "from_file");
        assert_eq!(app.framework.settings_module, "zproject.ci_settings");
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("zulip_test2"));
        assert!(is_identifier("_private"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
