//! Data models for a test-backend run
//!
//! Options resolved from the command line, the runner's verdict and the
//! final report.

mod options;
mod run_result;

pub use options::InvocationOptions;
pub use run_result::{ExternalOutcome, RunReport, RunResult};
