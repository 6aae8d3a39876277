//! Optional run instrumentation
//!
//! Coverage and profiling are scoped sessions that wrap the runner launch
//! and are finalized on every exit path.

mod coverage;
mod profile;

pub use coverage::{CoverageSession, CoverageTool, PythonCoverage};
pub use profile::ProfileSession;

#[cfg(test)]
pub(crate) use coverage::tests::RecordingCoverage;

use anyhow::Result;
use std::io::Write;

use crate::config::AppConfig;
use crate::framework::{FrameworkHandle, SetupError};
use crate::models::InvocationOptions;
use crate::runner::Wrapper;

/// The sessions active for one run, at most one of each kind
#[derive(Default)]
pub struct Instrumentation {
    coverage: Option<CoverageSession>,
    profile: Option<ProfileSession>,
}

impl Instrumentation {
    pub fn none() -> Self {
        Self::default()
    }

    /// Start the sessions the options ask for
    pub fn start(
        options: &InvocationOptions,
        config: &AppConfig,
        handle: &FrameworkHandle,
    ) -> Result<Self> {
        let mut instrumentation = Self::none();
        if options.coverage {
            let tool = PythonCoverage::new(config.coverage.clone(), &handle.working_dir);
            let session = CoverageSession::start(
                Box::new(tool),
                handle.working_dir.join(&config.coverage.html_dir),
            )
            .map_err(|source| SetupError::ToolUnavailable {
                tool: "coverage",
                source,
            })?;
            instrumentation.coverage = Some(session);
        }
        if options.profile {
            instrumentation.profile =
                Some(ProfileSession::start(config.profile.clone(), &handle.working_dir)?);
        }
        Ok(instrumentation)
    }

    pub fn with_coverage(mut self, session: CoverageSession) -> Self {
        self.coverage = Some(session);
        self
    }

    pub fn with_profile(mut self, session: ProfileSession) -> Self {
        self.profile = Some(session);
        self
    }

    /// Launch wrappers, innermost first: the profiler runs inside coverage
    pub fn wrappers(&self) -> Vec<Wrapper> {
        self.profile
            .iter()
            .map(ProfileSession::wrapper)
            .chain(self.coverage.iter().map(CoverageSession::wrapper))
            .collect()
    }

    /// Finalize every session. All sessions are attempted; the first error
    /// is returned.
    pub fn finish(&mut self, out: &mut dyn Write) -> Result<()> {
        let coverage = match self.coverage {
            Some(ref mut session) => session.finish(out),
            None => Ok(()),
        };
        let profile = match self.profile {
            Some(ref mut session) => session.finish(out),
            None => Ok(()),
        };
        coverage.and(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoverageConfig, ProfileConfig};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_wrapper_order() {
        let dir = tempdir().unwrap();
        let (tool, _calls) = RecordingCoverage::new();
        let instrumentation = Instrumentation::none()
            .with_coverage(CoverageSession::start(Box::new(tool), "htmlcov").unwrap())
            .with_profile(
                ProfileSession::start(
                    ProfileConfig {
                        output: "profile.data".into(),
                        ..Default::default()
                    },
                    dir.path(),
                )
                .unwrap(),
            );

        let wrappers = instrumentation.wrappers();
        assert_eq!(wrappers.len(), 2);
        assert_eq!(wrappers[0].module_args[1], "cProfile");
        assert_eq!(wrappers[1].module_args[1], "coverage");
    }

    #[test]
    fn test_finish_attempts_all_sessions() {
        let dir = tempdir().unwrap();
        let (mut tool, calls) = RecordingCoverage::new();
        tool.fail_save = true;
        let profile = ProfileSession::start(
            ProfileConfig {
                output: "profile.data".into(),
                ..Default::default()
            },
            dir.path(),
        )
        .unwrap();
        std::fs::write(dir.path().join("profile.data"), "dump").unwrap();

        let mut instrumentation = Instrumentation::none()
            .with_coverage(CoverageSession::start(Box::new(tool), "htmlcov").unwrap())
            .with_profile(profile);

        let mut out = Vec::new();
        assert!(instrumentation.finish(&mut out).is_err());
        assert_eq!(calls.borrow().saves, 1);
        assert!(String::from_utf8(out).unwrap().contains("Profile data saved to"));
    }

    #[test]
    fn test_missing_coverage_tool_is_setup_error() {
        let dir = tempdir().unwrap();
        let options = InvocationOptions {
            coverage: true,
            ..Default::default()
        };
        let config = AppConfig {
            coverage: CoverageConfig {
                interpreter: "/nonexistent/python3".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let handle = FrameworkHandle {
            runner_program: PathBuf::from("./manage.py"),
            runner_args: Vec::new(),
            failfast_flag: String::new(),
            working_dir: dir.path().to_path_buf(),
            env: Vec::new(),
        };

        let err = match Instrumentation::start(&options, &config, &handle) {
            Ok(_) => panic!("coverage started without an interpreter"),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::ToolUnavailable { tool: "coverage", .. })
        ));
        assert_eq!(crate::failure_exit_code(&err), crate::SETUP_FAILURE_EXIT);
    }

    #[test]
    fn test_none_is_inactive() {
        let mut instrumentation = Instrumentation::none();
        assert!(instrumentation.wrappers().is_empty());
        assert!(instrumentation.finish(&mut Vec::new()).is_ok());
    }
}
