//! Bounded status polling.
//!
//! The inference provider has no push notification, only a status URL, so
//! we ask it on a fixed schedule and give up after a fixed number of tries.
//!
//! ## Algorithm
//! For attempt = 1..=max_attempts:
//! 1. Sleep one interval (the job never finishes instantly)
//! 2. Run the status check; an error aborts polling immediately
//! 3. Stop if the terminal predicate accepts the result
//!
//! With the default policy the loop waits at most 20 × 1.5 s = 30 s.
//! Sleeping goes through `tokio::time`, so tests run it on a paused clock.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1500);

/// Fixed-count, fixed-interval polling schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Longest time a poll can take before timing out.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INTERVAL)
    }
}

/// How a poll ended when no check returned an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// A check returned a terminal value
    Completed { value: T, attempts: u32 },
    /// Every attempt returned a non-terminal value
    TimedOut { attempts: u32, last: Option<T> },
}

/// Poll `check` under `policy` until `is_terminal` accepts its result.
///
/// `check` receives the 1-based attempt number.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    mut check: F,
    is_terminal: P,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let mut last = None;
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        let value = check(attempt).await?;
        if is_terminal(&value) {
            debug!(attempt, "Poll reached terminal state");
            return Ok(PollOutcome::Completed {
                value,
                attempts: attempt,
            });
        }
        debug!(attempt, max_attempts = policy.max_attempts, "Still waiting");
        last = Some(value);
    }

    Ok(PollOutcome::TimedOut {
        attempts: policy.max_attempts,
        last,
    })
}
