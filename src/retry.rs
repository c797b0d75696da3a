//! Bounded retry with exponential backoff for outbound model calls.
//!
//! Vision-model APIs fail transiently and often under load. The policy here
//! is intentionally blunt: a fixed number of attempts with an unjittered
//! exponential delay between them, and **every** failure is retried the same
//! way. There is no classification of client errors versus server errors,
//! so a 400 burns through the full attempt budget just like a 503. Keeping
//! the whole policy inside [`RetryPolicy`] means a later refinement to skip
//! non-retryable errors touches exactly one type.
//!
//! The delay schedule is a pure function of the attempt index
//! ([`RetryPolicy::backoff_delay`]) and sleeping goes through the
//! [`Sleeper`] trait, so tests observe the schedule without waiting on a
//! real clock.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// All attempts failed; `last` is the error from the final one.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempts: {last}")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// A successful call plus how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    /// Total attempts made, including the successful one.
    pub attempts: u32,
}

/// Abstraction over waiting, injectable for tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Real waiting via the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Fixed-attempt retry with exponential, unjittered backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound on attempts, successful or not.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles per failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay slept after failed attempt `attempt` (0-indexed):
    /// `base_delay * 2^attempt`. With the default policy the schedule
    /// between attempts is 1 s, 2 s, 4 s, 8 s.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    /// Drive `call` until it succeeds or the attempt budget is spent.
    ///
    /// Each failure is logged and slept over; exhaustion returns the last
    /// error wrapped in [`RetryExhausted`] for the caller to absorb. No
    /// delay follows the final failure since no attempt comes after it.
    pub async fn run<T, E, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        mut call: F,
    ) -> Result<Attempted<T>, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let budget = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            match call().await {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        attempts: attempt + 1,
                    })
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= budget {
                        return Err(RetryExhausted {
                            attempts: budget,
                            last: e,
                        });
                    }
                    let delay = self.backoff_delay(attempt - 1);
                    warn!(
                        "attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, budget, e, delay
                    );
                    sleeper.sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSleeper;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..4).map(|i| policy.backoff_delay(i).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8]);
    }

    #[test]
    fn backoff_scales_with_base() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn succeeds_on_fifth_attempt_after_four_sleeps() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result = policy
            .run(&sleeper, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 4 {
                        Err("transient")
                    } else {
                        Ok("done")
                    }
                }
            })
            .await
            .expect("fifth attempt succeeds");

        assert_eq!(result.value, "done");
        assert_eq!(result.attempts, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let secs: Vec<u64> = sleeper.delays().iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![1, 2, 4, 8]);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempt_count_and_last_error() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let err = policy
            .run(&sleeper, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("still down") }
            })
            .await
            .expect_err("never succeeds");

        assert_eq!(err.attempts, 5);
        assert_eq!(err.last, "still down");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // No sleep after the final failure.
        assert_eq!(sleeper.delays().len(), 4);
    }

    #[tokio::test]
    async fn first_attempt_success_sleeps_never() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();

        let result = policy
            .run(&sleeper, || async { Ok::<_, &str>(42) })
            .await
            .unwrap();

        assert_eq!(result.value, 42);
        assert_eq!(result.attempts, 1);
        assert!(sleeper.delays().is_empty());
    }
}
