//! Async retry loops on the tokio timer.
//!
//! These mirror the blocking drivers. Each iteration has three phases:
//!
//! 1. await the action (cancellable);
//! 2. check / classify-and-decide, a plain synchronous call (not cancellable);
//! 3. await the pause (cancellable).
//!
//! Cancelling means dropping the driver's future, e.g. from `tokio::select!`
//! or `tokio::time::timeout`. A drop can only happen at the awaits of phase 1
//! and 3, so a decision that has started always completes, while a running
//! action or a pending pause is abandoned immediately.

use std::future::Future;

use super::decision::{classify, consult, RetryDecision};
use super::handler::Handler;
use crate::policy::RetryPolicy;

/// Async form of [`retrying`](super::retrying).
pub async fn retrying_async<T, C, F, Fut>(policy: &RetryPolicy, mut check: C, mut action: F) -> T
where
    C: FnMut(u32, &T) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
{
    let mut iteration = 0u32;
    loop {
        let result = action().await;
        if !check(iteration, &result) {
            return result;
        }
        match consult(policy, iteration) {
            RetryDecision::NoRetry => return result,
            RetryDecision::RetryAfter(d) => {
                tokio::time::sleep(d).await;
                iteration = iteration.saturating_add(1);
            }
        }
    }
}

/// Async form of [`recovering`](super::recovering).
pub async fn recovering_async<T, E, F, Fut>(
    policy: &RetryPolicy,
    handlers: &mut [Handler<'_, E>],
    mut action: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut iteration = 0u32;
    loop {
        let failure = match action().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match classify(policy, handlers, iteration, &failure) {
            RetryDecision::NoRetry => return Err(failure),
            RetryDecision::RetryAfter(d) => {
                tokio::time::sleep(d).await;
                iteration = iteration.saturating_add(1);
            }
        }
    }
}

/// Async form of [`recover_all`](super::recover_all).
pub async fn recover_all_async<T, E, F, Fut>(policy: &RetryPolicy, action: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    recovering_async(policy, &mut [Handler::any(|_, _| true)], action).await
}
