//! `ferry follow` – stream a command's output, restarting it when it fails.

use anyhow::Result;
use ferry_core::config::FerryConfig;

use super::process::ChildLines;
use super::{command_policy, command_spec};
use crate::cli::RetryArgs;

enum Step<T> {
    Pulled(Option<T>),
    Interrupted,
}

pub async fn run_follow(cfg: &FerryConfig, args: &RetryArgs, argv: Vec<String>) -> Result<()> {
    let spec = command_spec(argv)?;
    let policy = command_policy(cfg, args, &spec)?;

    let mut run = policy.stream(|| ChildLines::new(spec.clone()));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let step = tokio::select! {
            item = run.next() => Step::Pulled(item),
            _ = &mut ctrl_c => Step::Interrupted,
        };
        match step {
            Step::Pulled(Some(line)) => println!("{}", line?),
            Step::Pulled(None) => break,
            Step::Interrupted => {
                tracing::info!(program = %spec.program, "interrupted, stopping");
                run.close().await;
                break;
            }
        }
    }

    tracing::debug!(attempts = run.attempts(), "follow finished");
    Ok(())
}
