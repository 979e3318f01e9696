//! Bounded retry with exponential backoff, plus a per-call deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ModelClient, ModelRequest, ModelResponse};
use crate::error::ModelError;

/// Retry policy for transient model failures.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retry.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Upper bound for a single call, covering the whole provider round trip.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            call_timeout: Duration::from_secs(120),
        }
    }
}

/// Wraps another client. Transport errors and timeouts are retried with a
/// doubling backoff; anything else is returned as-is.
pub struct RetryingModelClient {
    inner: Arc<dyn ModelClient>,
    policy: RetryPolicy,
}

impl RetryingModelClient {
    pub fn new(inner: Arc<dyn ModelClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn attempt(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        match tokio::time::timeout(self.policy.call_timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout {
                secs: self.policy.call_timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl ModelClient for RetryingModelClient {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 0u32;
        loop {
            match self.attempt(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        model = %request.model,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient model error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
