use std::{future::Future, time::Duration};

/// Bounded retry policy. The backoff multiplier is applied once to the base
/// interval; the delay between attempts does not grow.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub retry_interval: Duration,
    pub backoff: f64,
    pub log: bool,
}

impl RetryPolicy {
    /// Policy used for chain reads: 20 attempts, 10 seconds apart.
    pub const READ: Self = Self::new(20, Duration::from_secs(10));
    /// Policy used for transaction submission: resubmitting is riskier than reading.
    pub const SUBMIT: Self = Self::new(3, Duration::from_secs(20));

    pub const fn new(max_retries: usize, retry_interval: Duration) -> Self {
        Self {
            max_retries,
            retry_interval,
            backoff: 1.0,
            log: true,
        }
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn silent(mut self) -> Self {
        self.log = false;
        self
    }

    pub fn delay(&self) -> Duration {
        self.retry_interval.mul_f64(self.backoff.max(0.0))
    }
}

/// Runs `operation` up to `policy.max_retries` times, sleeping
/// `policy.delay()` between failed attempts. Returns the last error once the
/// attempts are exhausted.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = eyre::Result<T>>,
{
    let delay = policy.delay();
    let mut last_error = None;

    for attempt in 1..=policy.max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if policy.log {
                    tracing::warn!("{e}");
                    tracing::warn!("caught error, retrying... [{attempt}]");
                }
                last_error = Some(e);

                if attempt < policy.max_retries {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        eyre::eyre!("Could not execute operation in {} tries", policy.max_retries)
    }))
}
