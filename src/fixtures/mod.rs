//! Fixture regeneration
//!
//! Runs the external fixture generator before the suites. The generator's
//! exit status is advisory, so the result is an [`ExternalOutcome`] rather
//! than an error and the caller applies the failure policy.

use tracing::{debug, info};

use crate::framework::FrameworkHandle;
use crate::models::ExternalOutcome;

/// Something that refreshes test fixtures
#[allow(async_fn_in_trait)]
pub trait FixtureTask {
    async fn regenerate(&self, handle: &FrameworkHandle) -> ExternalOutcome;
}

/// Fixture generator run as a blocking subprocess
#[derive(Clone, Debug)]
pub struct FixtureGenerator {
    command: Vec<String>,
}

impl FixtureGenerator {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl FixtureTask for FixtureGenerator {
    async fn regenerate(&self, handle: &FrameworkHandle) -> ExternalOutcome {
        let Some((program, args)) = self.command.split_first() else {
            return ExternalOutcome::Unavailable {
                reason: "no fixture command configured".to_string(),
            };
        };

        let Some(path) = handle.locate(program) else {
            return ExternalOutcome::Unavailable {
                reason: format!("{program} not found"),
            };
        };

        info!("Regenerating fixtures with {}", path.display());

        match handle.command(&path).args(args).status().await {
            Ok(status) if status.success() => ExternalOutcome::Success,
            Ok(status) => {
                debug!("Fixture generator exited with {}", status);
                ExternalOutcome::Failed {
                    code: status.code(),
                }
            }
            Err(e) => ExternalOutcome::Unavailable {
                reason: format!("failed to start {}: {e}", path.display()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn handle(dir: &Path) -> FrameworkHandle {
        FrameworkHandle {
            runner_program: dir.join("manage.py"),
            runner_args: Vec::new(),
            failfast_flag: String::new(),
            working_dir: dir.to_path_buf(),
            env: Vec::new(),
        }
    }

    #[test]
    fn test_empty_command_is_unavailable() {
        let dir = tempdir().unwrap();
        let outcome = tokio_test::block_on(FixtureGenerator::new(Vec::new()).regenerate(&handle(dir.path())));
        assert!(matches!(outcome, ExternalOutcome::Unavailable { .. }));
    }

    #[test]
    fn test_missing_generator_is_unavailable() {
        let dir = tempdir().unwrap();
        let generator = FixtureGenerator::new(vec!["tools/generate-fixtures".to_string()]);
        let outcome = tokio_test::block_on(generator.regenerate(&handle(dir.path())));
        assert_eq!(
            outcome,
            ExternalOutcome::Unavailable {
                reason: "tools/generate-fixtures not found".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_maps_to_outcome() {
        let dir = tempdir().unwrap();
        let handle = handle(dir.path());

        let ok = FixtureGenerator::new(vec!["sh".to_string(), "-c".to_string(), "exit 0".to_string()]);
        assert_eq!(ok.regenerate(&handle).await, ExternalOutcome::Success);

        let failing =
            FixtureGenerator::new(vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()]);
        assert_eq!(
            failing.regenerate(&handle).await,
            ExternalOutcome::Failed { code: Some(3) }
        );
    }
}
