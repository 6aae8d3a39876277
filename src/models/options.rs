//! Resolved invocation options

use serde::Serialize;
use std::path::PathBuf;

use crate::cli::{Args, DEFAULT_SUITE};

/// Options for one test-backend invocation, resolved before any test runs
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvocationOptions {
    /// Stop at the first failing test
    pub fatal_errors: bool,
    /// Wrap the run in a coverage session
    pub coverage: bool,
    /// Wrap the run in a profiling session
    pub profile: bool,
    /// Treat shallow-rendered templates as failures
    pub no_shallow: bool,
    /// List every shallow-rendered template
    pub verbose: bool,
    /// Suites to run, in the order given
    pub suites: Vec<String>,
    #[serde(skip)]
    pub summary_json: Option<PathBuf>,
}

impl InvocationOptions {
    /// Resolve options from parsed arguments
    pub fn from_args(args: Args) -> Self {
        Self::from_args_with_default(args, DEFAULT_SUITE)
    }

    /// Resolve options, substituting `default_suite` when no suite was named
    pub fn from_args_with_default(args: Args, default_suite: &str) -> Self {
        let suites = if args.suites.is_empty() {
            vec![default_suite.to_string()]
        } else {
            args.suites
        };

        Self {
            fatal_errors: !args.nonfatal_errors,
            coverage: args.coverage,
            profile: args.profile,
            no_shallow: args.no_shallow,
            verbose: args.verbose,
            suites,
            summary_json: args.summary_json,
        }
    }
}

impl Default for InvocationOptions {
    fn default() -> Self {
        Self {
            fatal_errors: true,
            coverage: false,
            profile: false,
            no_shallow: false,
            verbose: false,
            suites: vec![DEFAULT_SUITE.to_string()],
            summary_json: None,
        }
    }
}
