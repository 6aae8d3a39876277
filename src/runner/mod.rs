//! Test runner abstraction
//!
//! The orchestrator only sees the [`TestRunner`] trait; the production
//! implementation drives the framework's own runner as a subprocess.

mod command;
mod launch;

pub use command::{CommandTestRunner, SHALLOW_REPORT_VAR};
pub use launch::{Launch, Wrapper};

use anyhow::Result;

use crate::framework::FrameworkHandle;

/// One request to run suites
#[derive(Clone, Copy, Debug)]
pub struct RunRequest<'a> {
    pub suites: &'a [String],
    /// Stop at the first failure
    pub fatal_errors: bool,
    /// Instrumentation wrappers, innermost first
    pub wrappers: &'a [Wrapper],
}

/// Runs test suites and reports shallow-rendered templates
#[allow(async_fn_in_trait)]
pub trait TestRunner {
    /// Run the requested suites; returns `true` when any test failed
    async fn run_tests(&mut self, handle: &FrameworkHandle, request: RunRequest<'_>)
        -> Result<bool>;

    /// Templates the last run exercised only shallowly, in reported order
    fn shallow_tested_templates(&self) -> Vec<String>;
}
