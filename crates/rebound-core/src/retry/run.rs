//! Blocking retry loops: run a closure until it succeeds or the policy says stop.
//! Between attempts the calling thread sleeps for the policy's delay.

use super::decision::{classify, consult, RetryDecision};
use super::handler::Handler;
use crate::policy::RetryPolicy;

/// Runs `action` until `check` accepts its result or the policy stops.
///
/// `check` receives the iteration index and the result and returns `true` to
/// ask for another attempt. Never fails on its own: when the policy is
/// exhausted the last result is returned as-is, so callers inspect it.
pub fn retrying<T, C, F>(policy: &RetryPolicy, mut check: C, mut action: F) -> T
where
    C: FnMut(u32, &T) -> bool,
    F: FnMut() -> T,
{
    let mut iteration = 0u32;
    loop {
        let result = action();
        if !check(iteration, &result) {
            return result;
        }
        match consult(policy, iteration) {
            RetryDecision::NoRetry => return result,
            RetryDecision::RetryAfter(d) => {
                std::thread::sleep(d);
                iteration = iteration.saturating_add(1);
            }
        }
    }
}

/// Runs `action` until it succeeds, retrying failures claimed by `handlers`.
///
/// Handlers are scanned in order and the first one whose kind matches decides
/// alone. The original failure is returned when no handler matches, when the
/// matching handler declines, or when the policy is exhausted.
pub fn recovering<T, E, F>(
    policy: &RetryPolicy,
    handlers: &mut [Handler<'_, E>],
    mut action: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    let mut iteration = 0u32;
    loop {
        let failure = match action() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match classify(policy, handlers, iteration, &failure) {
            RetryDecision::NoRetry => return Err(failure),
            RetryDecision::RetryAfter(d) => {
                std::thread::sleep(d);
                iteration = iteration.saturating_add(1);
            }
        }
    }
}

/// [`recovering`] with a single handler that retries every failure.
///
/// Use narrowly: it also retries failures that will never go away.
pub fn recover_all<T, E, F>(policy: &RetryPolicy, action: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    recovering(policy, &mut [Handler::any(|_, _| true)], action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{constant_delay, limit_retries};
    use std::time::Duration;

    fn quick(max_retries: u32) -> RetryPolicy {
        constant_delay(Duration::from_millis(1)) + limit_retries(max_retries)
    }

    #[test]
    fn retrying_returns_first_accepted_result() {
        let mut calls = 0;
        let out = retrying(&quick(5), |_, r: &u32| *r < 3, || {
            calls += 1;
            calls
        });
        assert_eq!(out, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn retrying_check_sees_iterations_in_order() {
        let mut seen = Vec::new();
        retrying(
            &quick(3),
            |n, _: &()| {
                seen.push(n);
                true
            },
            || (),
        );
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn retrying_no_policy_room_runs_once() {
        let mut calls = 0;
        let out = retrying(&limit_retries(0), |_, _: &bool| true, || {
            calls += 1;
            false
        });
        assert!(!out);
        assert_eq!(calls, 1);
    }

    #[test]
    fn recovering_success_after_failures() {
        let mut calls = 0;
        let out: Result<&str, String> = recover_all(&quick(5), || {
            calls += 1;
            if calls < 3 {
                Err(format!("attempt {calls}"))
            } else {
                Ok("done")
            }
        });
        assert_eq!(out, Ok("done"));
        assert_eq!(calls, 3);
    }

    #[test]
    fn recovering_returns_latest_failure_on_exhaustion() {
        let mut calls = 0;
        let out: Result<(), String> = recover_all(&quick(2), || {
            calls += 1;
            Err(format!("attempt {calls}"))
        });
        assert_eq!(out, Err("attempt 3".to_string()));
    }

    #[test]
    fn recovering_with_no_handlers_is_fatal() {
        let mut calls = 0;
        let out: Result<(), &str> = recovering(&quick(5), &mut [], || {
            calls += 1;
            Err("boom")
        });
        assert_eq!(out, Err("boom"));
        assert_eq!(calls, 1);
    }
}
