//! Call profiling session

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::ProfileConfig;
use crate::runner::Wrapper;

/// An active cProfile session; the dump is written when the runner exits
pub struct ProfileSession {
    config: ProfileConfig,
    output: PathBuf,
    finished: bool,
}

impl ProfileSession {
    /// Start profiling, discarding any previous dump
    pub fn start(config: ProfileConfig, working_dir: impl Into<PathBuf>) -> Result<Self> {
        let output = working_dir.into().join(&config.output);
        match std::fs::remove_file(&output) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove old profile {}", output.display()))
            }
        }
        info!("Profiling enabled, dumping to {}", output.display());
        Ok(Self {
            config,
            output,
            finished: false,
        })
    }

    pub fn wrapper(&self) -> Wrapper {
        Wrapper {
            interpreter: self.config.interpreter.clone(),
            module_args: vec![
                "-m".to_string(),
                "cProfile".to_string(),
                "-o".to_string(),
                self.output.to_string_lossy().into_owned(),
            ],
            env: Vec::new(),
        }
    }

    pub fn output(&self) -> &std::path::Path {
        &self.output
    }

    /// Report where the dump went. Later calls are no-ops.
    pub fn finish(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        if !self.output.exists() {
            anyhow::bail!("No profile data was written to {}", self.output.display());
        }
        writeln!(out, "Profile data saved to {}", self.output.display())?;
        writeln!(
            out,
            "You can visualize it using e.g. `{} {}`",
            self.config.viewer,
            self.output.display()
        )?;
        Ok(())
    }
}

impl Drop for ProfileSession {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish(&mut std::io::stdout()) {
                warn!("Profile finalization failed: {:#}", e);
            }
        }
    }
}
