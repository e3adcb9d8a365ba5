//! Bounded retry with exponential backoff for transport failures.
//!
//! Only errors for which [`ApiError::is_transient`] holds are retried:
//! connection failures, timeouts, and HTTP 408, 429, 502, 503, 504. A server
//! answering `success: false` is a decision, not a fault, and is returned to
//! the caller on the first attempt.
//!
//! Delay before retry `n` (0-based) is `initial_delay * 2^n`, capped at
//! `max_delay`, then down-jittered by up to `jitter_factor`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::api::{NegotiationApi, TransitionResponse};
use super::error::ApiError;
use super::negotiation::NegotiationRecord;
use super::payload::SubmissionPayload;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 0.25 shortens each delay by up to 25%.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, backoff_step: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step.min(30) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jitter_factor = self.jitter_factor.clamp(0.0, 1.0);
        let jitter = 1.0 - rand::random::<f64>() * jitter_factor;
        Duration::from_secs_f64(capped * jitter)
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// policy's retries are spent.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut retry_count = 0;
    loop {
        match op().await {
            Err(err) if err.is_transient() && retry_count < policy.max_retries => {
                let delay = policy.delay_for(retry_count);
                retry_count += 1;
                tracing::debug!(
                    operation,
                    error = %err,
                    retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying request after transport error"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                if retry_count > 0 {
                    tracing::warn!(operation, error = %err, attempts = retry_count + 1, "Giving up");
                }
                return Err(err);
            }
            Ok(value) => return Ok(value),
        }
    }
}

/// Wraps any [`NegotiationApi`] with a retry policy.
pub struct RetryingApi<A> {
    inner: A,
    policy: RetryPolicy,
}

impl<A: NegotiationApi> RetryingApi<A> {
    pub fn new(inner: A, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<A: NegotiationApi> NegotiationApi for RetryingApi<A> {
    async fn fetch_record(&self, negotiation_id: &str) -> Result<NegotiationRecord, ApiError> {
        retry_transient(&self.policy, "fetch_record", || {
            self.inner.fetch_record(negotiation_id)
        })
        .await
    }

    async fn accept_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        retry_transient(&self.policy, "accept_offer", || {
            self.inner.accept_offer(negotiation_id, payload, idempotency_key)
        })
        .await
    }

    async fn reject_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        retry_transient(&self.policy, "reject_offer", || {
            self.inner.reject_offer(negotiation_id, payload, idempotency_key)
        })
        .await
    }

    async fn counter_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        retry_transient(&self.policy, "counter_offer", || {
            self.inner.counter_offer(negotiation_id, payload, idempotency_key)
        })
        .await
    }
}
