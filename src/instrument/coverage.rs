//! Code coverage session
//!
//! Coverage commands use blocking `std::process` so a session can still be
//! finalized from `Drop`.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::CoverageConfig;
use crate::runner::Wrapper;

/// Backend that measures and reports coverage
pub trait CoverageTool {
    /// Prepare a fresh measurement (discard data from earlier runs)
    fn begin(&mut self) -> Result<()>;

    /// How the runner must be launched to be measured
    fn wrapper(&self) -> Wrapper;

    /// Stop measuring and persist the collected data
    fn save(&mut self) -> Result<()>;

    /// Print the textual summary, without missing-line detail
    fn report(&mut self, out: &mut dyn Write) -> Result<()>;

    /// Write the HTML report into `dir`
    fn html_report(&mut self, dir: &Path) -> Result<()>;
}

/// coverage.py driven through the Python interpreter
pub struct PythonCoverage {
    config: CoverageConfig,
    working_dir: PathBuf,
}

impl PythonCoverage {
    pub fn new(config: CoverageConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            working_dir: working_dir.into(),
        }
    }

    fn data_file(&self) -> PathBuf {
        self.working_dir.join(&self.config.data_file)
    }

    fn omit_arg(&self) -> Option<String> {
        (!self.config.omit.is_empty()).then(|| format!("--omit={}", self.config.omit.join(",")))
    }

    fn coverage_command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.current_dir(&self.working_dir)
            .env("COVERAGE_FILE", self.data_file())
            .args(["-m", "coverage", subcommand]);
        cmd
    }

    fn run(&self, mut cmd: Command, what: &str) -> Result<std::process::Output> {
        debug!("Running coverage {}", what);
        let output = cmd
            .output()
            .with_context(|| format!("Failed to run coverage {what}"))?;
        if !output.status.success() {
            anyhow::bail!(
                "coverage {} failed: {}",
                what,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }
}

impl CoverageTool for PythonCoverage {
    fn begin(&mut self) -> Result<()> {
        self.run(self.coverage_command("erase"), "erase")?;
        Ok(())
    }

    fn wrapper(&self) -> Wrapper {
        let mut module_args = vec!["-m".to_string(), "coverage".to_string(), "run".to_string()];
        module_args.extend(self.omit_arg());
        Wrapper {
            interpreter: self.config.interpreter.clone(),
            module_args,
            env: vec![(
                "COVERAGE_FILE".to_string(),
                self.data_file().to_string_lossy().into_owned(),
            )],
        }
    }

    fn save(&mut self) -> Result<()> {
        let data_file = self.data_file();
        if !data_file.exists() {
            anyhow::bail!("No coverage data recorded at {}", data_file.display());
        }
        debug!("Coverage data saved to {}", data_file.display());
        Ok(())
    }

    fn report(&mut self, out: &mut dyn Write) -> Result<()> {
        let mut cmd = self.coverage_command("report");
        cmd.args(self.omit_arg());
        let output = self.run(cmd, "report")?;
        out.write_all(&output.stdout)
            .context("Failed to write coverage summary")?;
        Ok(())
    }

    fn html_report(&mut self, dir: &Path) -> Result<()> {
        let mut cmd = self.coverage_command("html");
        cmd.args(self.omit_arg()).arg("-d").arg(dir);
        self.run(cmd, "html")?;
        Ok(())
    }
}

/// An active coverage measurement.
///
/// Finalized exactly once: explicitly through [`CoverageSession::finish`],
/// or on drop if the run bailed out before reaching it.
pub struct CoverageSession {
    tool: Box<dyn CoverageTool>,
    html_dir: PathBuf,
    finished: bool,
}

impl CoverageSession {
    pub fn start(mut tool: Box<dyn CoverageTool>, html_dir: impl Into<PathBuf>) -> Result<Self> {
        tool.begin().context("Failed to start coverage session")?;
        info!("Coverage measurement enabled");
        Ok(Self {
            tool,
            html_dir: html_dir.into(),
            finished: false,
        })
    }

    pub fn wrapper(&self) -> Wrapper {
        self.tool.wrapper()
    }

    /// Stop, save and report. Later calls are no-ops.
    pub fn finish(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        self.tool.save()?;
        self.tool.report(out)?;
        self.tool.html_report(&self.html_dir)?;
        writeln!(out, "HTML report saved to {}", self.html_dir.display())?;
        Ok(())
    }
}

impl Drop for CoverageSession {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish(&mut std::io::stdout()) {
                warn!("Coverage finalization failed: {:#}", e);
            }
        }
    }
}
