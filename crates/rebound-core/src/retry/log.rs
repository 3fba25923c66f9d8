//! Handlers that report each retry decision as a line of text.

use std::error::Error;
use std::fmt;

use super::handler::{Failure, Handler};

/// The report for one decision:
/// `[retry:<iteration>] Encountered <failure>. Retrying.` (or `Giving up.`).
pub fn retry_message(iteration: u32, failure: &dyn fmt::Display, retrying: bool) -> String {
    let next = if retrying { "Retrying." } else { "Giving up." };
    format!("[retry:{iteration}] Encountered {failure}. {next}")
}

/// A handler for every failure that asks `should_retry`, reports the verdict
/// through `report`, and returns the verdict unchanged.
pub fn log_retries<'a, E, P, R>(mut should_retry: P, mut report: R) -> Handler<'a, E>
where
    E: fmt::Display + ?Sized,
    P: FnMut(&E) -> bool + Send + 'a,
    R: FnMut(&str) + Send + 'a,
{
    Handler::any(move |iteration, failure: &E| {
        let verdict = should_retry(failure);
        report(&retry_message(iteration, &failure, verdict));
        verdict
    })
}

/// [`log_retries`] restricted to failures whose concrete type is `K`.
pub fn log_retries_on<'a, K, E, P, R>(mut should_retry: P, mut report: R) -> Handler<'a, E>
where
    K: Error + Send + Sync + 'static,
    E: Failure + ?Sized,
    P: FnMut(&K) -> bool + Send + 'a,
    R: FnMut(&str) + Send + 'a,
{
    Handler::on(move |iteration, cause: &K| {
        let verdict = should_retry(cause);
        report(&retry_message(iteration, cause, verdict));
        verdict
    })
}

/// A reporter that emits each message as a `tracing` warning tagged with
/// `operation`.
pub fn tracing_reporter(operation: &str) -> impl FnMut(&str) + '_ {
    move |message: &str| tracing::warn!(operation = %operation, "{message}")
}
