//! `rebound poll` – rerun a command until its output contains a marker.

use anyhow::{bail, Context, Result};
use rebound_core::retry::retrying_async;
use rebound_core::RetryPolicy;
use std::io::{self, Write};
use std::process::Output;
use tokio::process::Command;

fn output_contains(output: &io::Result<Output>, needle: &str) -> bool {
    match output {
        Ok(o) => String::from_utf8_lossy(&o.stdout).contains(needle),
        Err(_) => false,
    }
}

/// Rerun `argv` until its stdout contains `until`, then print that output.
/// Fails if the policy runs out first.
pub async fn run_poll(policy: &RetryPolicy, argv: &[String], until: &str, report: bool) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        bail!("no command given");
    };
    let check = |iteration: u32, output: &io::Result<Output>| {
        let ready = output_contains(output, until);
        if !ready {
            tracing::debug!(iteration, program = %program, "marker not seen yet");
            if report {
                eprintln!("rebound: [poll:{iteration}] `{until}` not in output yet");
            }
        }
        !ready
    };
    let action = || async move {
        Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
    };
    let last = tokio::select! {
        out = retrying_async(policy, check, action) => out,
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    };
    let ready = output_contains(&last, until);
    let output = last.with_context(|| format!("failed to start `{program}`"))?;
    io::stdout().write_all(&output.stdout)?;
    if !ready {
        bail!("gave up waiting for `{until}` in the output of `{program}`");
    }
    Ok(())
}
