//! `ferry run` – rerun a command until it succeeds, then print its output.

use anyhow::Result;
use ferry_core::config::FerryConfig;
use std::io::Write;

use super::{command_policy, command_spec};
use crate::cli::RetryArgs;

pub async fn run_once(cfg: &FerryConfig, args: &RetryArgs, argv: Vec<String>) -> Result<()> {
    let spec = command_spec(argv)?;
    let policy = command_policy(cfg, args, &spec)?;

    let stdout = policy.call(|| spec.output()).await?;

    let mut out = std::io::stdout().lock();
    out.write_all(stdout.as_bytes())?;
    out.flush()?;
    Ok(())
}
