//! Policy constructors: the basic shapes and the limiters that bound them.

use std::time::Duration;

use super::RetryPolicy;

/// Allow `max_retries` retries with no delay of its own, then stop.
///
/// Contributes nothing but the limit; combine it with a backoff shape.
pub fn limit_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(move |n| (n < max_retries).then_some(Duration::ZERO))
}

/// Stop as soon as `inner` asks for a delay of `cutoff` or more.
///
/// Bounds how long a single wait may get rather than how many attempts run.
pub fn limit_retries_by_delay(cutoff: Duration, inner: RetryPolicy) -> RetryPolicy {
    RetryPolicy::new(move |n| inner.delay(n).filter(|d| *d < cutoff))
}

/// Wait `base` between every attempt, forever.
pub fn constant_delay(base: Duration) -> RetryPolicy {
    RetryPolicy::new(move |_| Some(base))
}

/// Wait `2^n * base` after `n` attempts, saturating at [`Duration::MAX`].
pub fn exponential_backoff(base: Duration) -> RetryPolicy {
    RetryPolicy::new(move |n| Some(doubled(base, n)))
}

/// Wait for the `n+1`-th term of the Fibonacci sequence seeded at `(0, base)`:
/// `base, base, 2*base, 3*base, 5*base, ...`, saturating at [`Duration::MAX`].
pub fn fibonacci_backoff(base: Duration) -> RetryPolicy {
    RetryPolicy::new(move |n| Some(fibonacci(base, n)))
}

/// Clamp every delay of `inner` to at most `max`. Never stops on its own.
pub fn cap_delay(max: Duration, inner: RetryPolicy) -> RetryPolicy {
    RetryPolicy::new(move |n| inner.delay(n).map(|d| d.min(max)))
}

fn doubled(base: Duration, n: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let nanos = base.as_nanos();
    // Shifting past the leading zeros would drop high bits.
    if n >= nanos.leading_zeros() {
        return Duration::MAX;
    }
    from_nanos_saturating(nanos << n)
}

fn from_nanos_saturating(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}

fn fibonacci(base: Duration, n: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let (mut a, mut b) = (Duration::ZERO, base);
    for _ in 0..=n {
        (a, b) = (b, a.saturating_add(b));
        // Every later term is MAX too.
        if a == Duration::MAX {
            break;
        }
    }
    a
}
