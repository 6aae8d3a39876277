//! test-backend - backend test-suite launcher
//!
//! Wraps the web framework's test runner with coverage, profiling and
//! shallow-template checks, and ships a companion reset tool for the test
//! database.
//!
//! ## Usage
//!
//! ```bash
//! # Recreate the test database and flush memcached
//! reset-test-db
//!
//! # Run the default suite
//! test-backend
//!
//! # Run selected suites, keep going after failures, measure coverage
//! test-backend --nonfatal-errors --coverage zerver.tests.test_events
//!
//! # Fail when templates were only shallowly rendered, and list them
//! test-backend --no-shallow --verbose
//! ```

pub mod cli;
pub mod config;
pub mod fixtures;
pub mod framework;
pub mod instrument;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod prepare;
pub mod runner;
pub mod utils;

/// Exit status when the framework or its prerequisites are missing
pub const SETUP_FAILURE_EXIT: u8 = 3;

/// Exit status for an invocation that ended in an error
pub fn failure_exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<framework::SetupError>().is_some() {
        SETUP_FAILURE_EXIT
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framework::SetupError;

    #[test]
    fn test_setup_error_exit_code() {
        let err = anyhow::Error::new(SetupError::RunnerMissing {
            program: "./manage.py".to_string(),
            searched: "/srv/zulip".to_string(),
        });
        assert_eq!(failure_exit_code(&err), SETUP_FAILURE_EXIT);

        let wrapped = err.context("Failed to start");
        assert_eq!(failure_exit_code(&wrapped), SETUP_FAILURE_EXIT);
    }

    #[test]
    fn test_other_error_exit_code() {
        let err = anyhow::anyhow!("coverage report failed");
        assert_eq!(failure_exit_code(&err), 1);
    }
}
