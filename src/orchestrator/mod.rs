//! Test run orchestration
//!
//! Drives one invocation from fixture regeneration to the final verdict.
//! Instrumentation is finalized whether or not the run body succeeds; a
//! runner error is returned only after that.

use anyhow::Result;
use chrono::Utc;
use std::io::Write;
use tracing::{debug, info, warn};

use crate::config::FailurePolicy;
use crate::fixtures::FixtureTask;
use crate::framework::FrameworkHandle;
use crate::instrument::Instrumentation;
use crate::models::{ExternalOutcome, InvocationOptions, RunReport, RunResult};
use crate::output::{evaluate_shallow, write_lines, write_verdict};
use crate::runner::{RunRequest, TestRunner};
use crate::utils::Stopwatch;

/// What the run body produced before finalization
struct BodyOutcome {
    fixtures: ExternalOutcome,
    result: RunResult,
    shallow_violation: bool,
}

/// One test-backend invocation
pub struct Orchestrator<'a, R, F> {
    options: &'a InvocationOptions,
    handle: &'a FrameworkHandle,
    fixture_policy: FailurePolicy,
    runner: R,
    fixtures: F,
}

impl<'a, R: TestRunner, F: FixtureTask> Orchestrator<'a, R, F> {
    pub fn new(
        options: &'a InvocationOptions,
        handle: &'a FrameworkHandle,
        runner: R,
        fixtures: F,
    ) -> Self {
        Self {
            options,
            handle,
            fixture_policy: FailurePolicy::Warn,
            runner,
            fixtures,
        }
    }

    pub fn fixture_policy(mut self, policy: FailurePolicy) -> Self {
        self.fixture_policy = policy;
        self
    }

    /// Run everything after instrumentation start and print the verdict
    pub async fn run(
        mut self,
        mut instrumentation: Instrumentation,
        out: &mut dyn Write,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut stopwatch = Stopwatch::new();

        let body = self.execute(&instrumentation, &mut stopwatch, out).await;

        out.flush().ok();
        let finalized = instrumentation.finish(out);
        stopwatch.lap("finalize");

        let body = body?;
        finalized?;

        let report = RunReport {
            suites: self.options.suites.clone(),
            failed: body.result.failed || body.shallow_violation,
            tests_failed: body.result.failed,
            shallow_violation: body.shallow_violation,
            shallow_templates: body.result.shallow_templates,
            fixtures: body.fixtures,
            started_at,
            completed_at: Utc::now(),
            phases: stopwatch.laps_ms(),
        };

        debug!("Phase timings:\n{}", stopwatch.format());
        write_verdict(out, &report)?;
        Ok(report)
    }

    async fn execute(
        &mut self,
        instrumentation: &Instrumentation,
        stopwatch: &mut Stopwatch,
        out: &mut dyn Write,
    ) -> Result<BodyOutcome> {
        let fixtures = self.fixtures.regenerate(self.handle).await;
        stopwatch.lap("fixtures");
        if !fixtures.is_success() {
            match self.fixture_policy {
                FailurePolicy::Warn => {
                    warn!("Fixture regeneration {}; continuing with existing fixtures", fixtures)
                }
                FailurePolicy::Abort => anyhow::bail!("Fixture regeneration {}", fixtures),
            }
        }

        let wrappers = instrumentation.wrappers();
        let request = RunRequest {
            suites: &self.options.suites,
            fatal_errors: self.options.fatal_errors,
            wrappers: &wrappers,
        };
        let failed = self.runner.run_tests(self.handle, request).await?;
        let result = RunResult {
            failed,
            shallow_templates: self.runner.shallow_tested_templates(),
        };
        stopwatch.lap("tests");

        info!(
            "Test runner finished: {} ({} shallow-tested templates)",
            if result.failed { "failures" } else { "ok" },
            result.shallow_templates.len()
        );

        let verdict = evaluate_shallow(
            &result.shallow_templates,
            self.options.no_shallow,
            self.options.verbose,
        );
        write_lines(out, &verdict.lines)?;

        Ok(BodyOutcome {
            fixtures,
            result,
            shallow_violation: verdict.force_failure,
        })
    }
}
