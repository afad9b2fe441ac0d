//! Backoff for transient driver failures.
//!
//! Only failures that a repeat of the same action can fix are retried: an
//! element that is present but covered, and a dropped protocol message.
//! Everything else is returned on the first attempt.

use crate::error::DriverError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Why an attempt is being repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RetryReason {
    NotInteractable,
    Protocol,
}

impl RetryReason {
    /// `None` for failures a repeat cannot fix.
    pub fn of(error: &DriverError) -> Option<Self> {
        match error {
            DriverError::NotInteractable(_) => Some(Self::NotInteractable),
            DriverError::Protocol(_) => Some(Self::Protocol),
            _ => None,
        }
    }
}

/// One scheduled repeat, reported before sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// The attempt that just failed, 1-based.
    pub attempt: u32,
    pub delay: Duration,
    pub reason: RetryReason,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Symmetric spread applied to each delay, 0.0..=1.0.
    pub jitter: f64,
}

impl RetryPolicy {
    /// Clicks, fills, reads and scripts.
    pub fn interaction_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            jitter: 0.10,
        }
    }

    /// Doubling delay before retry `retry` (1-based), capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// [`Self::backoff`] spread by the jitter ratio.
    pub fn delay_before(&self, retry: u32) -> Duration {
        let delay = self.backoff(retry);
        let ratio = self.jitter.clamp(0.0, 1.0);
        if ratio == 0.0 || delay.is_zero() {
            return delay;
        }
        let millis = delay.as_millis() as f64;
        let low = millis * (1.0 - ratio);
        let high = millis * (1.0 + ratio);
        let sampled = rand::thread_rng().gen_range(low..=high);
        Duration::from_millis(sampled.round() as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::interaction_default()
    }
}

/// Run `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up. `on_retry` is called before each sleep.
pub async fn retry_driver<T, Op, Fut, OnRetry>(
    policy: &RetryPolicy,
    mut operation: Op,
    mut on_retry: OnRetry,
) -> Result<T, DriverError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DriverError>>,
    OnRetry: FnMut(RetryAttempt),
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Err(error) if attempt < attempts => {
                let Some(reason) = RetryReason::of(&error) else {
                    return Err(error);
                };
                let delay = policy.delay_before(attempt);
                on_retry(RetryAttempt {
                    attempt,
                    delay,
                    reason,
                });
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn no_jitter(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            jitter: 0.0,
            ..RetryPolicy::interaction_default()
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            jitter: 0.0,
        };
        let delays: Vec<_> = (1..=4).map(|r| policy.backoff(r)).collect();
        assert_eq!(
            delays,
            [100, 200, 400, 500].map(Duration::from_millis).to_vec()
        );
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn jittered_delay_stays_within_spread() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            jitter: 0.5,
            ..RetryPolicy::interaction_default()
        };
        for _ in 0..50 {
            let delay = policy.delay_before(1);
            assert!((500..=1500).contains(&delay.as_millis()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn covered_element_is_retried_until_clickable() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let mut reasons = Vec::new();

        let result = retry_driver(
            &no_jitter(3),
            move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DriverError::NotInteractable("#submit".into()))
                } else {
                    Ok("clicked")
                }
            },
            |info| reasons.push((info.attempt, info.reason)),
        )
        .await;

        assert_eq!(result, Ok("clicked"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            reasons,
            vec![
                (1, RetryReason::NotInteractable),
                (2, RetryReason::NotInteractable)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_element_fails_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), _> = retry_driver(
            &no_jitter(5),
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DriverError::NotFound("#email".into()))
            },
            |_| panic!("not retried"),
        )
        .await;

        assert_eq!(result, Err(DriverError::NotFound("#email".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_error_is_returned_once_attempts_run_out() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), _> = retry_driver(
            &no_jitter(2),
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DriverError::Protocol("connection reset".into()))
            },
            |_| {},
        )
        .await;

        assert_eq!(result, Err(DriverError::Protocol("connection reset".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(RetryReason::Protocol.to_string(), "protocol");
    }
}
