//! Bounded retry with linear backoff for transient network failures.

use crate::error::{MintError, Result};
use std::future::Future;
use std::time::Duration;

/// Retry wrapper around a fallible network attempt.
///
/// The attempt closure receives the zero-based attempt index so the caller
/// can rotate to a different proxy on each try. Application-level error
/// responses are not routed through here; only thrown network errors are
/// retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Run the attempt up to the configured bound, waiting
    /// `base_delay * (attempt + 1)` between tries.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last: Option<MintError> = None;

        for index in 0..self.max_attempts {
            match attempt(index).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    eprintln!(
                        "    attempt {}/{} failed: {}",
                        index + 1,
                        self.max_attempts,
                        err
                    );
                    last = Some(err);
                    if index + 1 < self.max_attempts {
                        tokio::time::sleep(self.base_delay * (index as u32 + 1)).await;
                    }
                }
            }
        }

        Err(MintError::NetworkRetryExhausted {
            attempts: self.max_attempts,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}
