//! reset-test-db - bring the test database to a clean schema state
//!
//! Stops supervised services, closes sessions on the test databases,
//! recreates the role, database, schema and extensions, then flushes
//! memcached. Safe to re-run after any failure.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use test_backend::cli::ResetArgs;
use test_backend::config::{ConfigFile, EnvConfig};
use test_backend::prepare::{PlanOptions, Preparer, ResetPlan, SystemBackend};
use test_backend::utils::{init_logger, LogLevel};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = ResetArgs::parse();
    let env = EnvConfig::load();
    init_logger(LogLevel::resolve(env.log_level.as_deref(), args.default_log_level()));

    match run(args, env).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: ResetArgs, env: EnvConfig) -> Result<()> {
    let config = ConfigFile::resolve(args.config.as_deref(), &env)?;
    let plan = ResetPlan::build(
        &config.database,
        PlanOptions {
            skip_supervisor: args.skip_supervisor,
            skip_cache: args.skip_cache,
        },
    );

    if args.dry_run {
        for (index, step) in plan.steps().iter().enumerate() {
            println!("{:2}. {}", index + 1, step);
        }
        return Ok(());
    }

    let backend = SystemBackend::new(config.database, config.cache, config.supervisor);
    Preparer::new(backend).run(&plan).await?;
    Ok(())
}
