use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Bounded attempts with linear backoff: the wait after attempt `n` is `base * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts,
            backoff_base,
        }
    }

    /// Index endpoints served through the response cache.
    pub const fn cached() -> Self {
        Self::new(2, Duration::from_millis(500))
    }

    /// Quote and historical endpoints, which bypass the cache.
    pub const fn per_symbol() -> Self {
        Self::new(3, Duration::from_millis(1_000))
    }

    /// Cookie bootstrap against the origin's root page.
    pub const fn session() -> Self {
        Self::new(2, Duration::from_millis(500))
    }

    pub fn without_backoff(self) -> Self {
        Self {
            backoff_base: Duration::ZERO,
            ..self
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }

    /// Drive `op` until it succeeds or `max_attempts` is reached.
    ///
    /// Between two attempts the policy sleeps for `backoff(attempt)` and then
    /// awaits `between`, which is where callers repair state (e.g. refresh the
    /// session) before the next try. The error of the final attempt is returned.
    pub async fn run<T, E, Op, OpFut, Hook, HookFut>(
        &self,
        label: &str,
        mut op: Op,
        mut between: Hook,
    ) -> Result<T, E>
    where
        E: Display,
        Op: FnMut(u32) -> OpFut,
        OpFut: Future<Output = Result<T, E>>,
        Hook: FnMut(u32, &E) -> HookFut,
        HookFut: Future<Output = ()>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        label, attempt, max_attempts, e
                    );
                    sleep(self.backoff(attempt)).await;
                    between(attempt, &e).await;
                    attempt += 1;
                }
            }
        }
    }
}
