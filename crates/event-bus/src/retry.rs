//! Exponential backoff used for delivery retries and broker reconnects.

use std::time::Duration;

/// Parameters for an exponential backoff sequence.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Factor applied to the delay after each attempt.
    pub multiplier: f64,

    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a constant delay between attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Starts a backoff sequence under this policy.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            current_delay: self.initial_delay,
            attempt: 0,
            policy: self.clone(),
        }
    }
}

/// Stateful backoff sequence produced by [`RetryPolicy::backoff`].
#[derive(Debug, Clone)]
pub struct Backoff {
    current_delay: Duration,
    attempt: u32,
    policy: RetryPolicy,
}

impl Backoff {
    /// Returns how many delays have been handed out so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the delay to wait before the next attempt and advances the
    /// sequence.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;
        let delay = self.current_delay;
        let grown = self.current_delay.as_secs_f64() * self.policy.multiplier;
        self.current_delay = Duration::from_secs_f64(grown).min(self.policy.max_delay);
        delay
    }

    /// Restarts the sequence, typically after a success.
    pub fn reset(&mut self) {
        self.current_delay = self.policy.initial_delay;
        self.attempt = 0;
    }
}
