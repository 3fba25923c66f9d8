//! `rebound plan` – preview the delays of the effective policy.

use rebound_core::RetryPolicy;
use std::time::Duration;

/// One line per retry: its number, the pause before it, and the running total.
/// Ends with a `stop` line if the policy stops within `count` retries.
pub fn render_plan(policy: &RetryPolicy, count: u32) -> Vec<String> {
    let mut lines = vec![format!("{:<8} {:<14} {}", "RETRY", "DELAY", "TOTAL")];
    let mut total = Duration::ZERO;
    for (n, delay) in policy.simulate(count) {
        match delay {
            Some(d) => {
                total = total.saturating_add(d);
                lines.push(format!(
                    "{:<8} {:<14} {}",
                    n + 1,
                    format!("{d:?}"),
                    format!("{total:?}")
                ));
            }
            None => {
                lines.push(format!("{:<8} stop", n + 1));
                break;
            }
        }
    }
    lines
}

pub fn run_plan(policy: &RetryPolicy, count: u32) {
    for line in render_plan(policy, count) {
        println!("{line}");
    }
}
