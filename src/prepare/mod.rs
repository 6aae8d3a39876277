//! Test environment preparation
//!
//! Resets the test database to a fixed schema state and flushes the shared
//! cache. Steps run in order and the first failure aborts the reset; every
//! step is safe to repeat, so the remedy is to run the whole reset again.

mod backend;
mod plan;

pub use backend::{ResetBackend, SystemBackend};
pub use plan::{Connection, PlanOptions, ResetPlan, Statement, Step};

use thiserror::Error;
use tracing::info;

/// A reset step that failed
#[derive(Error, Debug)]
#[error("Reset step {index} ({step}) failed")]
pub struct PrepareError {
    pub index: usize,
    pub step: String,
    #[source]
    pub source: anyhow::Error,
}

/// Runs a [`ResetPlan`] against a backend
pub struct Preparer<B> {
    backend: B,
}

impl<B: ResetBackend> Preparer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    fn into_backend(self) -> B {
        self.backend
    }

    /// Execute every step, stopping at the first failure
    pub async fn run(&mut self, plan: &ResetPlan) -> Result<(), PrepareError> {
        for (index, step) in plan.steps().iter().enumerate() {
            let index = index + 1;
            info!("[{}/{}] {}", index, plan.steps().len(), step);
            self.run_step(step).await.map_err(|source| PrepareError {
                index,
                step: step.to_string(),
                source,
            })?;
        }
        info!("Test environment reset complete");
        Ok(())
    }

    async fn run_step(&mut self, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::StopServices => {
                if self.backend.supervisor_active().await? {
                    self.backend.stop_services().await
                } else {
                    info!("No service supervisor running, nothing to stop");
                    Ok(())
                }
            }
            Step::Sql {
                connection,
                statement,
            } => self.backend.execute(connection, statement).await,
            Step::FlushCache => self.backend.flush_cache().await,
        }
    }
}
