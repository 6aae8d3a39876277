//! CLI argument parsing
//!
//! Defines the command-line interfaces of both binaries using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::utils::LogLevel;

/// Suite run when no suite is named on the command line
pub const DEFAULT_SUITE: &str = "zerver.tests";

/// Run the backend test suite
#[derive(Parser, Debug)]
#[command(name = "test-backend")]
#[command(version)]
#[command(about = "Run the backend test suite with optional coverage and profiling")]
#[command(long_about = None)]
pub struct Args {
    /// Continue running after the first failing test
    #[arg(long = "nonfatal-errors")]
    pub nonfatal_errors: bool,

    /// Compute test coverage
    #[arg(long)]
    pub coverage: bool,

    /// Profile test runtime
    #[arg(long)]
    pub profile: bool,

    /// Don't allow shallow testing of templates
    #[arg(long = "no-shallow")]
    pub no_shallow: bool,

    /// List every shallow-tested template
    #[arg(long)]
    pub verbose: bool,

    /// Configuration file (overrides the default search locations)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write a JSON run summary to this path
    #[arg(long = "summary-json")]
    pub summary_json: Option<PathBuf>,

    /// Test suites to run
    #[arg(value_name = "SUITE")]
    pub suites: Vec<String>,
}

impl Args {
    /// Log level used when TEST_BACKEND_LOG is unset. `--verbose` only
    /// affects the shallow-template report.
    pub fn default_log_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Reset the test database to a clean schema state
#[derive(Parser, Debug)]
#[command(name = "reset-test-db")]
#[command(version)]
#[command(about = "Recreate the test database and flush the shared cache")]
pub struct ResetArgs {
    /// Configuration file (overrides the default search locations)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not stop supervisor-managed services
    #[arg(long)]
    pub skip_supervisor: bool,

    /// Do not flush the shared cache
    #[arg(long)]
    pub skip_cache: bool,

    /// Print the reset plan without executing it
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl ResetArgs {
    /// Log level used when TEST_BACKEND_LOG is unset
    pub fn default_log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["test-backend"]);
        assert!(!args.nonfatal_errors);
        assert!(!args.coverage);
        assert!(!args.profile);
        assert!(!args.no_shallow);
        assert!(!args.verbose);
        assert!(args.config.is_none());
        assert!(args.suites.is_empty());
    }

    #[test]
    fn test_all_flags() {
        let args = Args::parse_from([
            "test-backend",
            "--nonfatal-errors",
            "--coverage",
            "--profile",
            "--no-shallow",
            "--verbose",
            "zerver.tests.test_events",
            "zerver.tests.test_signup",
        ]);
        assert!(args.nonfatal_errors);
        assert!(args.coverage);
        assert!(args.profile);
        assert!(args.no_shallow);
        assert!(args.verbose);
        assert_eq!(
            args.suites,
            vec!["zerver.tests.test_events", "zerver.tests.test_signup"]
        );
    }

    #[test]
    fn test_verbose_keeps_info_logging() {
        let args = Args::parse_from(["test-backend", "--verbose"]);
        assert_eq!(args.default_log_level(), LogLevel::Info);

        let reset = ResetArgs::parse_from(["reset-test-db", "-v"]);
        assert_eq!(reset.default_log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = Args::try_parse_from(["test-backend", "--fast"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_reset_args() {
        let args = ResetArgs::parse_from(["reset-test-db", "--dry-run", "--skip-cache"]);
        assert!(args.dry_run);
        assert!(args.skip_cache);
        assert!(!args.skip_supervisor);
    }
}
