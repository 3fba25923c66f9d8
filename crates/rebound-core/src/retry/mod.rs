//! Retry drivers.
//!
//! Two ways of applying a [`RetryPolicy`](crate::policy::RetryPolicy) to an
//! action:
//!
//! - [`retrying`] inspects each result with a check and retries while the
//!   check asks for it. It never fails by itself; on exhaustion it returns
//!   the last result.
//! - [`recovering`] retries failures. Each failure goes through an ordered
//!   list of [`Handler`]s and the first one whose kind matches decides. When
//!   the loop is abandoned the caller gets the original failure back.
//!
//! Both come in a blocking form (the thread sleeps between attempts) and an
//! async form on the tokio timer.

mod decision;
mod handler;
mod log;
mod run;
mod run_async;

pub use decision::{classify, consult, RetryDecision};
pub use handler::{Failure, Handler};
pub use log::{log_retries, log_retries_on, retry_message, tracing_reporter};
pub use run::{recover_all, recovering, retrying};
pub use run_async::{recover_all_async, recovering_async, retrying_async};
