//! `ferry config` – show where settings live and what they resolve to.

use anyhow::Result;
use ferry_core::config::{self, FerryConfig};
use ferry_core::logging;
use ferry_core::retry::RetryPolicy;

use super::process::CommandError;

pub fn run_config(cfg: &FerryConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("config: {}", path.display());
    if let Ok(log) = logging::log_path() {
        println!("log:    {}", log.display());
    }

    let policy = RetryPolicy::<CommandError>::from_config(&cfg.retry)?;
    println!("policy: {}", policy);
    if cfg.command.retryable_exit_codes.is_empty() {
        println!("retrying every non-zero exit");
    } else {
        println!("retrying exit codes {:?}", cfg.command.retryable_exit_codes);
    }

    println!();
    print!("{}", std::fs::read_to_string(&path)?);
    Ok(())
}
