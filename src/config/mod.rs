//! Configuration module
//!
//! Handles loading and managing configuration for both binaries.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::ConfigFile;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cli::DEFAULT_SUITE;

/// Application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub framework: FrameworkConfig,
    pub fixtures: FixtureConfig,
    pub coverage: CoverageConfig,
    pub profile: ProfileConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub supervisor: SupervisorConfig,
}

/// External test framework settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Variable selecting the framework settings module
    pub settings_var: String,
    /// Settings module used for test runs
    pub settings_module: String,
    /// Variable that disables output buffering
    pub unbuffered_var: String,
    /// Program that runs the test suites
    pub runner_program: String,
    /// Arguments placed before the suite names
    pub runner_args: Vec<String>,
    /// Flag passed to the runner when errors are fatal
    pub failfast_flag: String,
    /// Suite run when none is named
    pub default_suite: String,
    /// Working directory for the runner and fixture tasks
    pub working_dir: Option<PathBuf>,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            settings_var: "DJANGO_SETTINGS_MODULE".to_string(),
            settings_module: "zproject.test_settings".to_string(),
            unbuffered_var: "PYTHONUNBUFFERED".to_string(),
            runner_program: "./manage.py".to_string(),
            runner_args: vec!["test".to_string(), "--noinput".to_string()],
            failfast_flag: "--failfast".to_string(),
            default_suite: DEFAULT_SUITE.to_string(),
            working_dir: None,
        }
    }
}

/// What to do when fixture regeneration does not succeed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Warn,
    Abort,
}

/// Fixture regeneration settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Command line of the fixture generator; empty disables it
    pub command: Vec<String>,
    pub failure_policy: FailurePolicy,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            command: vec!["tools/generate-fixtures".to_string()],
            failure_policy: FailurePolicy::Warn,
        }
    }
}

/// Coverage measurement settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Interpreter that hosts the coverage module
    pub interpreter: String,
    /// File patterns excluded from measurement
    pub omit: Vec<String>,
    pub data_file: PathBuf,
    pub html_dir: PathBuf,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            omit: vec!["*/zulip-venv-cache/*".to_string()],
            data_file: PathBuf::from(".coverage"),
            html_dir: PathBuf::from("htmlcov"),
        }
    }
}

/// Call profiling settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub interpreter: String,
    pub output: PathBuf,
    /// Viewer suggested for the dump
    pub viewer: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            output: PathBuf::from("/tmp/profile.data"),
            viewer: "runsnake".to_string(),
        }
    }
}

/// Test database settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Administrative role used for role and database DDL
    pub admin_role: String,
    /// Role that owns the test database
    pub app_role: String,
    pub database: String,
    /// Database the admin connects to while the target is dropped
    pub maintenance_database: String,
    pub schema: String,
    pub search_path: Vec<String>,
    pub extensions: Vec<String>,
    /// Extra databases whose sessions are terminated before the reset
    pub related_databases: Vec<String>,
    pub psql_program: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            admin_role: "postgres".to_string(),
            app_role: "zulip".to_string(),
            database: "zulip_test".to_string(),
            maintenance_database: "postgres".to_string(),
            schema: "zulip".to_string(),
            search_path: vec!["zulip".to_string(), "public".to_string()],
            extensions: vec!["tsearch_extras".to_string()],
            related_databases: vec!["zulip_test_template".to_string()],
            psql_program: "psql".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Every database whose open sessions must be closed before a reset
    pub fn databases_to_terminate(&self) -> Vec<String> {
        let mut names = vec![self.database.clone()];
        for name in &self.related_databases {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Shared cache settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// memcached address as host:port
    pub address: String,
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:11211".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Service supervisor settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub program: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            program: "supervisorctl".to_string(),
        }
    }
}
