//! test-backend - run the backend test suite
//!
//! Exits 0 when every selected test passed (and, with `--no-shallow`, no
//! template was only shallowly rendered), 1 otherwise, 3 on setup failure.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use test_backend::cli::Args;
use test_backend::config::{ConfigFile, EnvConfig};
use test_backend::fixtures::FixtureGenerator;
use test_backend::framework::{configure_environment, initialize};
use test_backend::instrument::Instrumentation;
use test_backend::models::InvocationOptions;
use test_backend::orchestrator::Orchestrator;
use test_backend::output::save_summary;
use test_backend::runner::CommandTestRunner;
use test_backend::utils::{init_logger, LogLevel};
use test_backend::{failure_exit_code, SETUP_FAILURE_EXIT};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let env = EnvConfig::load();
    init_logger(LogLevel::resolve(env.log_level.as_deref(), args.default_log_level()));

    match run(args, env).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let code = failure_exit_code(&e);
            if code == SETUP_FAILURE_EXIT {
                eprintln!("Setup failed: {e:#}");
                eprintln!("Is the development environment provisioned?");
            } else {
                error!("{:#}", e);
            }
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args, env: EnvConfig) -> Result<u8> {
    let config = ConfigFile::resolve(args.config.as_deref(), &env)?;
    let options = InvocationOptions::from_args_with_default(args, &config.framework.default_suite);

    let configured = configure_environment(&config.framework);
    let handle = initialize(&config.framework, &configured)?;

    let instrumentation = Instrumentation::start(&options, &config, &handle)?;

    let runner = CommandTestRunner::new();
    let fixtures = FixtureGenerator::new(config.fixtures.command.clone());
    let report = Orchestrator::new(&options, &handle, runner, fixtures)
        .fixture_policy(config.fixtures.failure_policy)
        .run(instrumentation, &mut std::io::stdout())
        .await?;

    if let Some(ref path) = options.summary_json {
        save_summary(&report, path)?;
    }

    Ok(report.exit_code())
}
