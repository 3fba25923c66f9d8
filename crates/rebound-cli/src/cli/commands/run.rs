//! `rebound run` – rerun a command until it exits successfully.

use anyhow::{bail, Result};
use rebound_core::retry::{log_retries, recovering_async, tracing_reporter, Handler};
use rebound_core::RetryPolicy;
use std::io;
use thiserror::Error;
use tokio::process::Command;

/// Why one run of the command failed.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` {}", describe_exit(.code))]
    Exit { program: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with status {c}"),
        None => "was terminated by a signal".to_string(),
    }
}

impl CommandError {
    /// Exit status to hand back to our own caller.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Exit { code, .. } => *code,
            CommandError::Spawn { .. } => None,
        }
    }
}

/// Whether a spawn failure may go away; a missing or forbidden program won't.
fn spawn_is_transient(err: &CommandError) -> bool {
    match err {
        CommandError::Spawn { source, .. } => !matches!(
            source.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
        ),
        CommandError::Exit { .. } => false,
    }
}

/// Exit failures worth another attempt: any non-zero status, or only the
/// listed ones when `retry_on` is not empty.
fn exit_is_retryable(err: &CommandError, retry_on: &[i32]) -> bool {
    match err {
        CommandError::Exit { code: Some(c), .. } => retry_on.is_empty() || retry_on.contains(c),
        CommandError::Exit { code: None, .. } => retry_on.is_empty(),
        CommandError::Spawn { .. } => false,
    }
}

/// Handlers in priority order: spawn failures first, then exit statuses.
pub(crate) fn handlers(retry_on: &[i32], report: bool) -> Vec<Handler<'_, CommandError>> {
    let mut trace = tracing_reporter("run");
    vec![
        Handler::new(
            "spawn",
            |e: &CommandError| matches!(e, CommandError::Spawn { .. }),
            |iteration, e| {
                let transient = spawn_is_transient(e);
                tracing::debug!(iteration, transient, error = %e, "spawn failed");
                transient
            },
        ),
        log_retries(
            move |e: &CommandError| exit_is_retryable(e, retry_on),
            move |msg: &str| {
                trace(msg);
                if report {
                    eprintln!("rebound: {msg}");
                }
            },
        ),
    ]
}

async fn attempt(program: &str, args: &[String]) -> Result<(), CommandError> {
    let status = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(CommandError::Exit {
            program: program.to_string(),
            code: status.code(),
        })
    }
}

/// Run `argv` under `policy` until it succeeds, gives up, or Ctrl-C.
pub async fn run_command(
    policy: &RetryPolicy,
    argv: &[String],
    retry_on: &[i32],
    report: bool,
) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        bail!("no command given");
    };
    let mut handlers = handlers(retry_on, report);
    tokio::select! {
        res = recovering_async(policy, &mut handlers, || attempt(program, args)) => {
            res?;
            tracing::info!(program = %program, "command succeeded");
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    }
}
