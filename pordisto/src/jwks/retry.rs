use std::time::Duration;

/// How often and how patiently a failed key set fetch is retried
///
/// Delays start at `initial_delay` and are multiplied by `multiplier` after
/// each failure, never exceeding `max_delay`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: u32,
}

impl Default for RetryPolicy {
    /// Two retries, starting at 100 ms and doubling up to 2 seconds
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Constructs a new retry policy
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: u32,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// A policy that gives up after the first failure
    pub fn never() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub(super) fn backoff(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            attempts: 0,
            last_delay: None,
        }
    }
}

/// Retry state for one fetch
#[derive(Debug)]
pub(super) struct Backoff<'a> {
    policy: &'a RetryPolicy,
    attempts: u32,
    last_delay: Option<Duration>,
}

impl Backoff<'_> {
    /// Reports a failure; returns the delay before the next attempt, or
    /// `None` when retries are exhausted
    pub(super) fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_retries {
            return None;
        }
        self.attempts += 1;

        let delay = self
            .last_delay
            .map(|d| d.saturating_mul(self.policy.multiplier))
            .unwrap_or(self.policy.initial_delay)
            .min(self.policy.max_delay);
        self.last_delay = Some(delay);
        Some(delay)
    }

    /// The number of retries handed out so far
    pub(super) fn attempts(&self) -> u32 {
        self.attempts
    }
}
