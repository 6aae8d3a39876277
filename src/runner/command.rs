//! Subprocess-backed test runner

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{Launch, RunRequest, TestRunner};
use crate::framework::FrameworkHandle;

/// Variable telling the framework where to write shallow-rendered template
/// names, one per line
pub const SHALLOW_REPORT_VAR: &str = "TEST_BACKEND_SHALLOW_REPORT";

/// Runs the framework's test command and collects its shallow-template report
pub struct CommandTestRunner {
    report_path: PathBuf,
    shallow: Vec<String>,
}

impl CommandTestRunner {
    pub fn new() -> Self {
        Self::with_report_path(
            std::env::temp_dir().join(format!("test-backend-shallow-{}.txt", std::process::id())),
        )
    }

    pub fn with_report_path(path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: path.into(),
            shallow: Vec::new(),
        }
    }

    /// Command line for a request, before instrumentation wrapping
    pub fn base_launch(&self, handle: &FrameworkHandle, request: &RunRequest<'_>) -> Launch {
        let mut launch = Launch::new(handle.runner_program.to_string_lossy())
            .args(handle.runner_args.iter().cloned());
        if request.fatal_errors && !handle.failfast_flag.is_empty() {
            launch = launch.args([handle.failfast_flag.clone()]);
        }
        launch
            .args(request.suites.iter().cloned())
            .env(SHALLOW_REPORT_VAR, self.report_path.to_string_lossy())
    }

    /// Full command line, with wrappers applied innermost first
    pub fn launch_for(&self, handle: &FrameworkHandle, request: &RunRequest<'_>) -> Launch {
        request
            .wrappers
            .iter()
            .fold(self.base_launch(handle, request), |launch, wrapper| {
                launch.wrap(wrapper)
            })
    }
}

impl Default for CommandTestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner for CommandTestRunner {
    async fn run_tests(
        &mut self,
        handle: &FrameworkHandle,
        request: RunRequest<'_>,
    ) -> Result<bool> {
        self.shallow.clear();
        remove_stale(&self.report_path)?;

        let launch = self.launch_for(handle, &request);
        info!("Running {} suite(s): {}", request.suites.len(), launch.display());

        // Keep our own buffered output ahead of the child's.
        std::io::stdout().flush().ok();

        let status = handle
            .command(&launch.program)
            .args(&launch.args)
            .envs(launch.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()
            .await
            .with_context(|| format!("Failed to launch test runner: {}", launch.program))?;

        debug!("Test runner exited with {}", status);

        self.shallow = read_shallow_report(&self.report_path)?;
        if let Err(e) = std::fs::remove_file(&self.report_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", self.report_path.display(), e);
            }
        }

        Ok(!status.success())
    }

    fn shallow_tested_templates(&self) -> Vec<String> {
        self.shallow.clone()
    }
}

fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove stale {}", path.display())),
    }
}

/// Parse a shallow-template report; a missing report means none were recorded
fn read_shallow_report(path: &Path) -> Result<Vec<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let mut seen = HashSet::new();
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(String::from)
        .collect())
}
