//! Bounded exponential backoff with jitter.
//!
//! The first attempt runs immediately. After each failure that still has
//! attempts left, the policy sleeps for the current delay (plus up to half
//! of it again when jitter is on) and then grows the delay by the multiplier,
//! never past `max_delay`.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Retry policy parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts. Zero behaves like one.
    pub max_retries: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound for the delay before jitter.
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Returned when every attempt failed.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    #[error("all {attempts} attempts failed")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The error from the final attempt.
    #[must_use]
    pub fn last(&self) -> &E {
        match self {
            Self::Exhausted { last, .. } => last,
        }
    }
}

/// Runs `operation` until it succeeds or the attempts run out.
///
/// # Errors
///
/// Returns `RetryError::Exhausted` carrying the last failure.
pub async fn retry_with_config<F, Fut, T, E>(
    config: &RetryConfig,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    retry_with_sleeper(config, operation, tokio::time::sleep).await
}

async fn retry_with_sleeper<F, Fut, T, E, S, SFut>(
    config: &RetryConfig,
    mut operation: F,
    mut sleep: S,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let attempts = config.max_retries.max(1);
    let mut delay = config.base_delay.min(config.max_delay);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < attempts => {
                let wait = if config.jitter { add_jitter(delay) } else { delay };
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = wait.as_millis(),
                    "Attempt {attempt}/{attempts} failed, retrying"
                );
                sleep(wait).await;
                delay = next_delay(delay, config);
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempts, "all attempts failed");
                return Err(RetryError::Exhausted { attempts, last: e });
            }
        }
    }
}

fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    let grown = delay.as_secs_f64() * config.multiplier.max(1.0);
    Duration::try_from_secs_f64(grown)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Adds a uniform random extra in `[0, delay / 2)`.
fn add_jitter(delay: Duration) -> Duration {
    let half = delay.as_millis() / 2;
    if half == 0 {
        return delay;
    }
    let half = u64::try_from(half).unwrap_or(u64::MAX);
    delay + Duration::from_millis(rand::rng().random_range(0..half))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::future::ready;

    #[derive(Debug, Error)]
    #[error("boom {0}")]
    struct Boom(u32);

    fn config(max_retries: u32, jitter: bool) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
            jitter,
        }
    }

    #[tokio::test]
    async fn always_failing_operation_sleeps_between_attempts() {
        let sleeps = RefCell::new(Vec::new());
        let mut calls = 0;
        let result: Result<(), _> = retry_with_sleeper(
            &config(5, true),
            || {
                calls += 1;
                ready(Err(Boom(calls)))
            },
            |d| {
                sleeps.borrow_mut().push(d);
                ready(())
            },
        )
        .await;

        let err = result.unwrap_err();
        let RetryError::Exhausted { attempts, ref last } = err;
        assert_eq!(attempts, 5);
        assert_eq!(last.0, 5);
        assert_eq!(calls, 5);

        let sleeps = sleeps.into_inner();
        assert_eq!(sleeps.len(), 4);
        let bases = [100, 200, 350, 350];
        for (slept, base) in sleeps.iter().zip(bases) {
            let base = Duration::from_millis(base);
            assert!(*slept >= base, "{slept:?} < {base:?}");
            assert!(*slept < base + base / 2, "{slept:?} too much jitter");
        }
    }

    #[tokio::test]
    async fn delays_are_non_decreasing_without_jitter() {
        let sleeps = RefCell::new(Vec::new());
        let _: Result<(), _> = retry_with_sleeper(
            &config(6, false),
            || ready(Err(Boom(0))),
            |d| {
                sleeps.borrow_mut().push(d);
                ready(())
            },
        )
        .await;

        let sleeps = sleeps.into_inner();
        assert_eq!(sleeps.len(), 5);
        assert!(sleeps.windows(2).all(|w| w[0] <= w[1]));
        assert!(sleeps.iter().all(|d| *d <= Duration::from_millis(350)));
    }

    #[tokio::test]
    async fn success_after_failures_stops_retrying() {
        let sleeps = RefCell::new(0);
        let mut calls = 0;
        let result = retry_with_sleeper(
            &config(5, false),
            || {
                calls += 1;
                ready(if calls < 3 { Err(Boom(calls)) } else { Ok(calls) })
            },
            |_| {
                *sleeps.borrow_mut() += 1;
                ready(())
            },
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(sleeps.into_inner(), 2);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_sleeper(
            &config(0, false),
            || {
                calls += 1;
                ready(Err(Boom(calls)))
            },
            |_| ready(()),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.last().0, 1);
        assert_eq!(err.to_string(), "all 1 attempts failed");
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay, Duration::from_millis(500));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!((config.multiplier - 2.0).abs() < f64::EPSILON);
        assert!(config.jitter);
    }

    #[test]
    fn jitter_stays_below_half_the_delay() {
        let delay = Duration::from_millis(400);
        for _ in 0..100 {
            let jittered = add_jitter(delay);
            assert!(jittered >= delay);
            assert!(jittered < delay + Duration::from_millis(200));
        }
    }

    #[tokio::test]
    async fn public_entry_point_returns_first_success() {
        let result: Result<u32, RetryError<Boom>> =
            retry_with_config(&RetryConfig::default(), || ready(Ok(42))).await;
        assert_eq!(result.unwrap(), 42);
    }
}
