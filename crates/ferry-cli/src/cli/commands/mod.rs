//! CLI command handlers. Each command is in its own file.

mod config;
mod follow;
mod process;
mod run;

use anyhow::{Context, Result};
use ferry_core::config::FerryConfig;
use ferry_core::retry::{RetryPolicy, TracingObserver};
use std::sync::Arc;

use super::RetryArgs;
use process::{CommandError, CommandSpec, ExitCodePredicate};

pub use config::run_config;
pub use follow::run_follow;
pub use run::run_once;

/// Policy for one command: config values, CLI overrides on top, and the
/// `[command]` exit-code rules as classifier.
fn command_policy(
    cfg: &FerryConfig,
    args: &RetryArgs,
    spec: &CommandSpec,
) -> Result<RetryPolicy<CommandError>> {
    let policy = RetryPolicy::from_config(&args.apply(&cfg.retry))
        .context("invalid retry settings")?
        .with_predicate(ExitCodePredicate::new(cfg.command.clone()))
        .with_observer(Arc::new(TracingObserver::new(spec.program.clone())));
    tracing::debug!(program = %spec.program, "using {}", policy);
    Ok(policy)
}

fn command_spec(argv: Vec<String>) -> Result<CommandSpec> {
    CommandSpec::from_argv(argv).context("no command given after `--`")
}
