//! Shallow-template policy and run summary output

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::models::RunReport;

/// Outcome of applying the shallow-template policy to one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShallowVerdict {
    /// Lines to print, in order
    pub lines: Vec<String>,
    /// The run must be reported as failed
    pub force_failure: bool,
}

/// Decide what to report about shallow-rendered templates.
///
/// The count is reported when `no_shallow` or `verbose` is set, each
/// template once in runner order when `verbose` is set, and `no_shallow`
/// turns any shallow template into a failure.
pub fn evaluate_shallow(templates: &[String], no_shallow: bool, verbose: bool) -> ShallowVerdict {
    let mut seen = HashSet::new();
    let unique: Vec<&String> = templates.iter().filter(|t| seen.insert(*t)).collect();

    if unique.is_empty() {
        return ShallowVerdict::default();
    }

    let mut lines = Vec::new();
    if no_shallow || verbose {
        let label = if no_shallow { "Error" } else { "Warning" };
        lines.push(String::new());
        lines.push(format!(
            "  {}: {} {} shallow-tested (referenced but never fully rendered)!",
            label,
            unique.len(),
            if unique.len() == 1 {
                "template was"
            } else {
                "templates were"
            }
        ));
    }
    if verbose {
        lines.extend(unique.iter().map(|t| format!("    {t}")));
    }

    ShallowVerdict {
        lines,
        force_failure: no_shallow,
    }
}

pub fn write_lines(out: &mut dyn Write, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(out, "{line}").context("Failed to write report")?;
    }
    Ok(())
}

/// Print the one-word verdict that ends every run
pub fn write_verdict(out: &mut dyn Write, report: &RunReport) -> Result<()> {
    writeln!(out).context("Failed to write report")?;
    writeln!(out, "{}", report.verdict()).context("Failed to write report")?;
    out.flush().context("Failed to flush report")?;
    Ok(())
}

/// Save a JSON copy of the report
pub fn save_summary(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(report).context("Failed to serialize summary")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write summary: {}", path.display()))?;
    info!("Run summary written to {}", path.display());
    Ok(())
}
