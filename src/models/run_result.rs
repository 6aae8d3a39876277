//! Run outcome models
//!
//! Defines the runner verdict, the tri-state outcome of external
//! operations, and the final report written at the end of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the test runner reported for one run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Whether any test failed
    pub failed: bool,
    /// Templates rendered only shallowly, in the order the runner reported them
    pub shallow_templates: Vec<String>,
}

/// Outcome of an external operation whose exit status is advisory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExternalOutcome {
    Success,
    Failed { code: Option<i32> },
    Unavailable { reason: String },
}

impl ExternalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExternalOutcome::Success)
    }
}

impl fmt::Display for ExternalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalOutcome::Success => write!(f, "succeeded"),
            ExternalOutcome::Failed { code: Some(code) } => write!(f, "failed with status {code}"),
            ExternalOutcome::Failed { code: None } => write!(f, "terminated by signal"),
            ExternalOutcome::Unavailable { reason } => write!(f, "unavailable ({reason})"),
        }
    }
}

/// Final verdict of a test-backend invocation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub suites: Vec<String>,
    pub failed: bool,
    /// The runner itself reported a test failure
    pub tests_failed: bool,
    /// Failure was forced by the shallow-template policy
    pub shallow_violation: bool,
    pub shallow_templates: Vec<String>,
    pub fixtures: ExternalOutcome,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Phase durations in milliseconds
    pub phases: Vec<(String, u64)>,
}

impl RunReport {
    /// One-word summary printed as the last line of a run
    pub fn verdict(&self) -> &'static str {
        if self.failed {
            "FAILED!"
        } else {
            "DONE!"
        }
    }

    pub fn exit_code(&self) -> u8 {
        if self.failed {
            1
        } else {
            0
        }
    }
}
