//! The decision taken between attempts.
//!
//! Both driver families (blocking and async) share these functions. They are
//! synchronous on purpose: nothing here can be interrupted, so once a failure
//! has been observed the driver always finishes deciding before it can be
//! cancelled.

use std::time::Duration;

use crate::policy::RetryPolicy;

use super::handler::Handler;

/// Decision returned after an unsuccessful attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry; the driver hands back the last outcome.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Ask the policy whether attempt `iteration + 1` may run.
pub fn consult(policy: &RetryPolicy, iteration: u32) -> RetryDecision {
    match policy.delay(iteration) {
        Some(delay) => {
            tracing::debug!(
                iteration,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "retrying after delay"
            );
            RetryDecision::RetryAfter(delay)
        }
        None => {
            tracing::debug!(iteration, "retry policy exhausted");
            RetryDecision::NoRetry
        }
    }
}

/// Classify a failure through `handlers` and decide.
///
/// The first handler whose kind matches governs alone, even when it declines.
/// Without a match the failure is fatal. The policy is only consulted after
/// the handler elected to retry.
pub fn classify<E: ?Sized>(
    policy: &RetryPolicy,
    handlers: &mut [Handler<'_, E>],
    iteration: u32,
    failure: &E,
) -> RetryDecision {
    let Some(handler) = handlers.iter_mut().find(|h| h.matches(failure)) else {
        tracing::debug!(iteration, "no handler matches failure");
        return RetryDecision::NoRetry;
    };
    if !handler.should_retry(iteration, failure) {
        tracing::debug!(iteration, kind = handler.kind(), "handler declined to retry");
        return RetryDecision::NoRetry;
    }
    consult(policy, iteration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::limit_retries;

    #[derive(Debug, PartialEq)]
    enum Kind {
        X,
        Y,
    }

    fn is_x(k: &Kind) -> bool {
        *k == Kind::X
    }

    fn is_y(k: &Kind) -> bool {
        *k == Kind::Y
    }

    #[test]
    fn consult_follows_policy() {
        let p = limit_retries(1);
        assert_eq!(consult(&p, 0), RetryDecision::RetryAfter(Duration::ZERO));
        assert_eq!(consult(&p, 1), RetryDecision::NoRetry);
    }

    #[test]
    fn consult_passes_saturated_delays_through() {
        let p = RetryPolicy::new(|_| Some(Duration::MAX));
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert_eq!(consult(&p, 0), RetryDecision::RetryAfter(Duration::MAX));
        });
    }

    #[test]
    fn unmatched_failure_is_fatal() {
        let p = RetryPolicy::identity();
        let mut handlers = [Handler::new("x", is_x, |_, _| true)];
        assert_eq!(classify(&p, &mut handlers, 0, &Kind::Y), RetryDecision::NoRetry);
    }

    #[test]
    fn first_match_wins_even_when_declining() {
        let p = RetryPolicy::identity();
        let mut later_called = false;
        {
            let mut handlers = [
                Handler::new("x", is_x, |_, _| false),
                Handler::new("x-again", is_x, |_, _| {
                    later_called = true;
                    true
                }),
            ];
            assert_eq!(classify(&p, &mut handlers, 0, &Kind::X), RetryDecision::NoRetry);
        }
        assert!(!later_called);
    }

    #[test]
    fn skips_non_matching_handlers() {
        let p = RetryPolicy::identity();
        let mut handlers = [
            Handler::new("x", is_x, |_, _| false),
            Handler::new("y", is_y, |_, _| true),
        ];
        assert_eq!(
            classify(&p, &mut handlers, 3, &Kind::Y),
            RetryDecision::RetryAfter(Duration::ZERO)
        );
    }

    #[test]
    fn policy_has_final_say() {
        let p = limit_retries(2);
        let mut handlers = [Handler::any(|_, _: &Kind| true)];
        assert_eq!(classify(&p, &mut handlers, 2, &Kind::X), RetryDecision::NoRetry);
    }
}
