use rebound_core::logging;

mod cli;

use crate::cli::commands::CommandError;
use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr if the state dir is unusable.
    if let Err(err) = logging::init_logging() {
        if let Err(fallback) = logging::init_logging_stderr() {
            eprintln!("rebound: logging disabled ({err:#}; {fallback:#})");
        }
    }

    // Parse CLI and dispatch.
    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("rebound error: {:#}", err);
        let code = err
            .downcast_ref::<CommandError>()
            .and_then(CommandError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
