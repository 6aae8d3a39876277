//! Run reporting
//!
//! Shallow-template policy, the final verdict line and the JSON summary.

mod report;

pub use report::{evaluate_shallow, save_summary, write_lines, write_verdict, ShallowVerdict};
