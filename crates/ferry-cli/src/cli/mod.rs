//! CLI for the ferry retry runner.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ferry_core::config::{self, RetryConfig};

use commands::{run_config, run_follow, run_once};

/// Top-level CLI for the ferry retry runner.
#[derive(Debug, Parser)]
#[command(name = "ferry")]
#[command(about = "ferry: rerun flaky commands with exponential backoff under a deadline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides for the `[retry]` section of config.toml.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct RetryArgs {
    /// Give up after this many seconds of attempts and backoff (0 = never).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Retry without an overall deadline.
    #[arg(long, conflicts_with = "timeout")]
    pub no_timeout: bool,

    /// First backoff delay in seconds.
    #[arg(long, value_name = "SECS")]
    pub initial: Option<f64>,

    /// Upper bound on a single backoff delay in seconds.
    #[arg(long, value_name = "SECS")]
    pub max: Option<f64>,

    /// Growth factor applied to the delay after each failure.
    #[arg(long, value_name = "X")]
    pub multiplier: Option<f64>,
}

impl RetryArgs {
    /// `base` with every flag that was given applied on top.
    pub fn apply(&self, base: &RetryConfig) -> RetryConfig {
        let mut cfg = base.clone();
        if let Some(secs) = self.timeout {
            cfg.timeout_secs = secs;
        }
        if self.no_timeout {
            cfg.timeout_secs = 0.0;
        }
        if let Some(secs) = self.initial {
            cfg.initial_delay_secs = secs;
        }
        if let Some(secs) = self.max {
            cfg.max_delay_secs = secs;
        }
        if let Some(x) = self.multiplier {
            cfg.multiplier = x;
        }
        cfg
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a command until it exits successfully, then print its output.
    Run {
        #[command(flatten)]
        retry: RetryArgs,

        /// Program and arguments, after `--`.
        #[arg(last = true, required = true, value_name = "COMMAND")]
        argv: Vec<String>,
    },

    /// Stream a command's output line by line, restarting it when it fails.
    Follow {
        #[command(flatten)]
        retry: RetryArgs,

        /// Program and arguments, after `--`.
        #[arg(last = true, required = true, value_name = "COMMAND")]
        argv: Vec<String>,
    },

    /// Show the config file location, its contents and the effective policy.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run { retry, argv } => run_once(&cfg, &retry, argv).await?,
            CliCommand::Follow { retry, argv } => run_follow(&cfg, &retry, argv).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
