//! Test framework bring-up
//!
//! Environment configuration and one-time framework initialization. The
//! framework itself is external; initialization resolves everything later
//! stages need into a [`FrameworkHandle`] that is passed along explicitly.

use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FrameworkConfig;

/// Failures that prevent the framework from starting at all
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Test runner '{program}' not found (looked in {searched})")]
    RunnerMissing { program: String, searched: String },

    #[error("{var} is not set to '{expected}'; the environment must be configured before initialization")]
    SettingsNotConfigured { var: String, expected: String },

    #[error("Working directory {0} does not exist")]
    WorkingDirMissing(PathBuf),

    #[error("Cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("{tool} is not available")]
    ToolUnavailable {
        tool: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Proof that the process environment was configured.
///
/// Only [`configure_environment`] creates one, so [`initialize`] cannot run
/// before the variables that affect framework bootstrap are in place.
#[derive(Debug)]
pub struct ConfiguredEnv {
    vars: Vec<(String, String)>,
}

impl ConfiguredEnv {
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }
}

/// Set the variables the framework reads at bootstrap
pub fn configure_environment(config: &FrameworkConfig) -> ConfiguredEnv {
    let vars = vec![
        (config.settings_var.clone(), config.settings_module.clone()),
        (config.unbuffered_var.clone(), "y".to_string()),
    ];

    for (key, value) in &vars {
        debug!("Setting {}={}", key, value);
        env::set_var(key, value);
    }

    ConfiguredEnv { vars }
}

/// Everything the runner and fixture tasks need from initialization
#[derive(Clone, Debug)]
pub struct FrameworkHandle {
    pub runner_program: PathBuf,
    pub runner_args: Vec<String>,
    pub failfast_flag: String,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl FrameworkHandle {
    /// Build a command rooted in the framework's working directory and
    /// environment
    pub fn command(&self, program: impl AsRef<std::ffi::OsStr>) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(program);
        cmd.current_dir(&self.working_dir);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }

    /// Locate a helper program relative to the working directory or on PATH
    pub fn locate(&self, program: &str) -> Option<PathBuf> {
        locate_program(program, &self.working_dir)
    }
}

/// Initialize the framework once per process
pub fn initialize(
    config: &FrameworkConfig,
    env: &ConfiguredEnv,
) -> Result<FrameworkHandle, SetupError> {
    for (key, expected) in env.vars() {
        if env::var(key).ok().as_deref() != Some(expected.as_str()) {
            return Err(SetupError::SettingsNotConfigured {
                var: key.clone(),
                expected: expected.clone(),
            });
        }
    }

    let working_dir = match config.working_dir {
        Some(ref dir) => dir.clone(),
        None => env::current_dir().map_err(SetupError::CurrentDir)?,
    };
    if !working_dir.is_dir() {
        return Err(SetupError::WorkingDirMissing(working_dir));
    }

    let runner_program = locate_program(&config.runner_program, &working_dir).ok_or_else(|| {
        SetupError::RunnerMissing {
            program: config.runner_program.clone(),
            searched: if config.runner_program.contains('/') {
                working_dir.display().to_string()
            } else {
                "PATH".to_string()
            },
        }
    })?;

    info!(
        "Initialized test framework ({}={}, runner {})",
        config.settings_var,
        config.settings_module,
        runner_program.display()
    );

    Ok(FrameworkHandle {
        runner_program,
        runner_args: config.runner_args.clone(),
        failfast_flag: config.failfast_flag.clone(),
        working_dir,
        env: env.vars().to_vec(),
    })
}

/// Resolve `program` the way a shell would: paths relative to `base`,
/// bare names through PATH
pub fn locate_program(program: &str, base: &Path) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        return path.is_file().then_some(path);
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path, settings_var: &str) -> FrameworkConfig {
        FrameworkConfig {
            settings_var: settings_var.to_string(),
            unbuffered_var: format!("{settings_var}_UNBUFFERED"),
            runner_program: "./manage.py".to_string(),
            working_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_configure_then_initialize() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("manage.py"), "#!/usr/bin/env python3\n").unwrap();
        let config = config_in(dir.path(), "TEST_BACKEND_FRAMEWORK_SETTINGS_A");

        let configured = configure_environment(&config);
        assert_eq!(
            env::var("TEST_BACKEND_FRAMEWORK_SETTINGS_A").as_deref(),
            Ok("zproject.test_settings")
        );
        assert_eq!(
            env::var("TEST_BACKEND_FRAMEWORK_SETTINGS_A_UNBUFFERED").as_deref(),
            Ok("y")
        );

        let handle = initialize(&config, &configured).unwrap();
        assert_eq!(handle.runner_program, dir.path().join("./manage.py"));
        assert_eq!(handle.working_dir, dir.path());
        assert_eq!(handle.env.len(), 2);
    }

    #[test]
    fn test_initialize_detects_clobbered_environment() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("manage.py"), "").unwrap();
        let config = config_in(dir.path(), "TEST_BACKEND_FRAMEWORK_SETTINGS_B");

        let configured = configure_environment(&config);
        env::remove_var("TEST_BACKEND_FRAMEWORK_SETTINGS_B");

        let err = initialize(&config, &configured).unwrap_err();
        assert!(matches!(err, SetupError::SettingsNotConfigured { .. }));
    }

    #[test]
    fn test_missing_runner_is_setup_error() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), "TEST_BACKEND_FRAMEWORK_SETTINGS_C");

        let configured = configure_environment(&config);
        let err = initialize(&config, &configured).unwrap_err();
        assert!(matches!(err, SetupError::RunnerMissing { .. }));
        assert!(err.to_string().contains("./manage.py"));
    }

    #[test]
    fn test_locate_program() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tools")).unwrap();
        std::fs::write(dir.path().join("tools/generate-fixtures"), "").unwrap();

        assert!(locate_program("tools/generate-fixtures", dir.path()).is_some());
        assert!(locate_program("tools/missing", dir.path()).is_none());
        assert!(locate_program("definitely-not-a-real-program-name", dir.path()).is_none());
    }
}
