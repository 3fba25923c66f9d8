//! CLI command handlers. Each command is in its own file.

mod plan;
mod poll;
mod run;

pub use plan::{render_plan, run_plan};
pub use poll::run_poll;
pub use run::{run_command, CommandError};
