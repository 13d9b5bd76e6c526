use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Wait applied before the next attempt, given the number of the attempt that just failed.
#[derive(Clone)]
pub enum Backoff {
    /// `attempt²` seconds.
    Quadratic,
    Fixed(Duration),
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl Backoff {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Backoff::Custom(Arc::new(f))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Quadratic => Duration::from_secs(u64::from(attempt) * u64::from(attempt)),
            Backoff::Fixed(delay) => *delay,
            Backoff::Custom(f) => f(attempt),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Quadratic
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::Quadratic => f.write_str("Quadratic"),
            Backoff::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Backoff::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Bounded retry loop. Only errors accepted by the classifier are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Quadratic,
        }
    }
}

/// Outcome of a retried operation together with the number of attempts made.
#[derive(Debug)]
pub struct Attempted<T> {
    pub attempts: u32,
    pub result: T,
}

impl RetryPolicy {
    /// A policy making at most `max_attempts` attempts (at least one).
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn execute<F, Fut, T, E, R>(
        &self,
        mut operation: F,
        is_retryable: R,
    ) -> Attempted<Result<T, E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(result) => {
                    return Attempted {
                        attempts: attempt,
                        result: Ok(result),
                    }
                }
                Err(err) if !is_retryable(&err) => {
                    debug!("Attempt {} failed with a non-retryable error: {}", attempt, err);
                    return Attempted {
                        attempts: attempt,
                        result: Err(err),
                    };
                }
                Err(err) if attempt >= self.max_attempts => {
                    warn!("Operation failed after {} attempts: {}", attempt, err);
                    return Attempted {
                        attempts: attempt,
                        result: Err(err),
                    };
                }
                Err(err) => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        "Operation failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt, self.max_attempts, err, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
