//! Retry policies.
//!
//! A [`RetryPolicy`] answers one question: after `n` attempts have already
//! been made, how long should we wait before the next one, or should we stop?
//! The answer depends on `n` alone, so a policy is a pure function that can be
//! shared freely between threads and reused across any number of driver runs.
//!
//! Policies compose. Combining two policies stops as soon as either one stops
//! and otherwise waits for the larger of the two delays, which makes it easy to
//! build a schedule out of independent concerns:
//!
//! ```rust
//! use std::time::Duration;
//! use rebound_core::policy::{cap_delay, exponential_backoff, limit_retries};
//!
//! let policy = cap_delay(Duration::from_secs(2), exponential_backoff(Duration::from_millis(50)))
//!     + limit_retries(5);
//!
//! assert_eq!(policy.delay(0), Some(Duration::from_millis(50)));
//! assert_eq!(policy.delay(4), Some(Duration::from_millis(800)));
//! assert_eq!(policy.delay(5), None);
//! ```

mod builders;

pub use builders::{
    cap_delay, constant_delay, exponential_backoff, fibonacci_backoff, limit_retries,
    limit_retries_by_delay,
};

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::sync::Arc;
use std::time::Duration;

/// Delay used by the default policy between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(50);

/// Number of retries allowed by the default policy.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

type DelayFn = dyn Fn(u32) -> Option<Duration> + Send + Sync;

/// A pure function from iteration index to an optional delay.
///
/// `None` means "stop retrying". The iteration index is the number of
/// attempts already made, so the first retry decision is taken at `0`.
#[derive(Clone)]
pub struct RetryPolicy {
    delay_for: Arc<DelayFn>,
}

impl RetryPolicy {
    /// Wrap a delay function. The function must be pure: it may be queried at
    /// any index, in any order, any number of times.
    pub fn new<F>(delay_for: F) -> Self
    where
        F: Fn(u32) -> Option<Duration> + Send + Sync + 'static,
    {
        Self {
            delay_for: Arc::new(delay_for),
        }
    }

    /// The identity for [`RetryPolicy::combine`]: zero delay, never stops.
    pub fn identity() -> Self {
        Self::new(|_| Some(Duration::ZERO))
    }

    /// Delay to wait after `iteration` attempts, or `None` to stop.
    pub fn delay(&self, iteration: u32) -> Option<Duration> {
        (self.delay_for)(iteration)
    }

    /// Combine two policies: stop if either stops, otherwise wait for the
    /// larger delay. Associative and commutative, with [`RetryPolicy::identity`]
    /// as the neutral element.
    pub fn combine(&self, other: &RetryPolicy) -> RetryPolicy {
        let a = Arc::clone(&self.delay_for);
        let b = Arc::clone(&other.delay_for);
        Self::new(move |n| {
            let left = a(n)?;
            let right = b(n)?;
            Some(left.max(right))
        })
    }

    /// Shorthand for [`cap_delay`]`(max, self)`.
    pub fn capped(self, max: Duration) -> RetryPolicy {
        cap_delay(max, self)
    }

    /// Shorthand for `self + `[`limit_retries`]`(max_retries)`.
    pub fn limited(self, max_retries: u32) -> RetryPolicy {
        self + limit_retries(max_retries)
    }

    /// Shorthand for [`limit_retries_by_delay`]`(cutoff, self)`.
    pub fn give_up_after(self, cutoff: Duration) -> RetryPolicy {
        limit_retries_by_delay(cutoff, self)
    }

    /// The policy's answers for iterations `0..count`, including stops.
    ///
    /// Useful for previewing a schedule without running anything.
    pub fn simulate(&self, count: u32) -> Vec<(u32, Option<Duration>)> {
        (0..count).map(|n| (n, self.delay(n))).collect()
    }

    /// The delays a driver would sleep if every attempt failed, ending at the
    /// first stop. Unlimited policies yield forever; bound the iterator.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..=u32::MAX).map_while(move |n| self.delay(n))
    }
}

impl Default for RetryPolicy {
    /// Constant 50ms delay, at most 5 retries.
    fn default() -> Self {
        constant_delay(DEFAULT_DELAY) + limit_retries(DEFAULT_MAX_RETRIES)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy").finish_non_exhaustive()
    }
}

impl Add for RetryPolicy {
    type Output = RetryPolicy;

    fn add(self, rhs: RetryPolicy) -> RetryPolicy {
        self.combine(&rhs)
    }
}

impl Add for &RetryPolicy {
    type Output = RetryPolicy;

    fn add(self, rhs: &RetryPolicy) -> RetryPolicy {
        self.combine(rhs)
    }
}

impl Sum for RetryPolicy {
    fn sum<I: Iterator<Item = RetryPolicy>>(iter: I) -> Self {
        iter.fold(RetryPolicy::identity(), |acc, p| acc + p)
    }
}

impl<'a> Sum<&'a RetryPolicy> for RetryPolicy {
    fn sum<I: Iterator<Item = &'a RetryPolicy>>(iter: I) -> Self {
        iter.fold(RetryPolicy::identity(), |acc, p| acc.combine(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn default_policy_is_constant_50ms_for_five_retries() {
        let p = RetryPolicy::default();
        for n in 0..5 {
            assert_eq!(p.delay(n), Some(ms(50)), "iteration {n}");
        }
        assert_eq!(p.delay(5), None);
        assert_eq!(p.delay(100), None);
    }

    #[test]
    fn identity_never_stops_and_never_waits() {
        let p = RetryPolicy::identity();
        for n in [0, 1, 7, 1_000, u32::MAX] {
            assert_eq!(p.delay(n), Some(Duration::ZERO));
        }
    }

    #[test]
    fn combine_takes_larger_delay() {
        let p = constant_delay(ms(10)) + constant_delay(ms(30));
        assert_eq!(p.delay(0), Some(ms(30)));
    }

    #[test]
    fn combine_stop_dominates() {
        let p = constant_delay(ms(10)) + limit_retries(1);
        assert_eq!(p.delay(0), Some(ms(10)));
        assert_eq!(p.delay(1), None);
    }

    #[test]
    fn sum_of_nothing_is_identity() {
        let p: RetryPolicy = Vec::<RetryPolicy>::new().into_iter().sum();
        assert_eq!(p.delay(3), Some(Duration::ZERO));
    }

    #[test]
    fn sum_combines_all() {
        let parts = [
            exponential_backoff(ms(1)),
            constant_delay(ms(5)),
            limit_retries(4),
        ];
        let p: RetryPolicy = parts.iter().sum();
        assert_eq!(p.delay(0), Some(ms(5)));
        assert_eq!(p.delay(3), Some(ms(8)));
        assert_eq!(p.delay(4), None);
    }

    #[test]
    fn chaining_helpers_match_free_functions() {
        let p = exponential_backoff(ms(50))
            .capped(ms(100))
            .give_up_after(ms(100))
            .limited(10);
        assert_eq!(p.delay(0), Some(ms(50)));
        // capped to 100ms, which reaches the 100ms cutoff
        assert_eq!(p.delay(1), None);
    }

    #[test]
    fn simulate_reports_every_iteration() {
        let sim = RetryPolicy::default().simulate(7);
        assert_eq!(sim.len(), 7);
        assert_eq!(sim[0], (0, Some(ms(50))));
        assert_eq!(sim[5], (5, None));
        assert_eq!(sim[6], (6, None));
    }

    #[test]
    fn schedule_stops_at_first_stop() {
        let delays: Vec<_> = exponential_backoff(ms(1)).limited(4).schedule().collect();
        assert_eq!(delays, vec![ms(1), ms(2), ms(4), ms(8)]);
    }

    #[test]
    fn policies_are_shareable_across_threads() {
        let p = RetryPolicy::default();
        let handle = {
            let p = p.clone();
            std::thread::spawn(move || p.delay(2))
        };
        assert_eq!(handle.join().unwrap(), p.delay(2));
    }
}
