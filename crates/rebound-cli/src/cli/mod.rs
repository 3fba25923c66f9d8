//! CLI for rebound.

pub mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rebound_core::config::{self, BackoffKind, PolicyConfig};

use commands::{run_command, run_plan, run_poll};

/// Top-level CLI for rebound.
#[derive(Debug, Parser)]
#[command(name = "rebound")]
#[command(about = "rebound: rerun a command under a retry policy", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Do not print a line for each retry decision.
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides for the `[policy]` section of the config file.
#[derive(Debug, Default, Args)]
pub struct PolicyArgs {
    /// Delay curve: constant, exponential or fibonacci.
    #[arg(long, value_parser = parse_backoff, value_name = "KIND")]
    pub backoff: Option<BackoffKind>,

    /// Base delay in milliseconds.
    #[arg(long, value_name = "MS")]
    pub base_delay_ms: Option<u64>,

    /// Maximum number of retries after the first attempt.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Never wait longer than this between attempts, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub max_delay_ms: Option<u64>,

    /// Give up once the next delay would reach this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub give_up_after_ms: Option<u64>,

    /// Retry without an attempt limit (drops max_retries from the config).
    #[arg(long, conflicts_with = "max_retries")]
    pub forever: bool,
}

fn parse_backoff(s: &str) -> Result<BackoffKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "constant" => Ok(BackoffKind::Constant),
        "exponential" | "exp" => Ok(BackoffKind::Exponential),
        "fibonacci" | "fib" => Ok(BackoffKind::Fibonacci),
        other => Err(format!(
            "unknown backoff `{other}` (expected constant, exponential or fibonacci)"
        )),
    }
}

impl PolicyArgs {
    /// Layer the flags that were given over `base`.
    pub fn apply(&self, mut base: PolicyConfig) -> PolicyConfig {
        if let Some(kind) = self.backoff {
            base.backoff = kind;
        }
        if let Some(ms) = self.base_delay_ms {
            base.base_delay_ms = ms;
        }
        if self.forever {
            base.max_retries = None;
        }
        if let Some(n) = self.max_retries {
            base.max_retries = Some(n);
        }
        if let Some(ms) = self.max_delay_ms {
            base.max_delay_ms = Some(ms);
        }
        if let Some(ms) = self.give_up_after_ms {
            base.give_up_after_delay_ms = Some(ms);
        }
        base
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a command, retrying while it fails to start or exits non-zero.
    Run {
        /// Only retry these exit codes (comma separated). Default: any non-zero.
        #[arg(long, value_delimiter = ',', value_name = "CODES")]
        retry_on: Vec<i32>,

        /// Program and arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Rerun a command until its output contains the given text.
    Poll {
        /// Text to wait for in the command's stdout.
        #[arg(long)]
        until: String,

        /// Program and arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print the delays the effective policy would produce.
    Plan {
        /// Number of retries to show.
        #[arg(long, default_value = "10", value_name = "N")]
        count: u32,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        let policy_cfg = cli.policy.apply(cfg.policy);
        let policy = policy_cfg.to_policy()?;
        let report = cfg.report_retries && !cli.quiet;

        match cli.command {
            CliCommand::Run { retry_on, command } => {
                run_command(&policy, &command, &retry_on, report).await?
            }
            CliCommand::Poll { until, command } => {
                run_poll(&policy, &command, &until, report).await?
            }
            CliCommand::Plan { count } => run_plan(&policy, count),
        }

        Ok(())
    }
}
