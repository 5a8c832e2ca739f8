use crate::aws::sdk_error;
use crate::error::{DispatchError, IsRetryable};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::retry::RetryConfig;
use aws_sdk_sqs::config::timeout::TimeoutConfig;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;
use url::Url;

const RETRY_MIN_DELAY: Duration = Duration::from_millis(200);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(3);

/// Opaque at-least-once publish sink bound to one queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Send one encoded message body; returns the queue-assigned message id.
    async fn send(&self, message_body: &str) -> Result<String, DispatchError>;
}

/// SQS queue. The SDK's own retries are off; transient failures are retried
/// here with backoff so the worst case stays computable by [`Self::worst_case`].
pub struct SqsTaskQueue {
    client: Client,
    queue_url: String,
    max_retries: usize,
}

impl SqsTaskQueue {
    pub fn new(
        sdk: &SdkConfig,
        queue_url: &Url,
        attempt_timeout: Duration,
        max_retries: usize,
    ) -> Self {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(5))
            .operation_attempt_timeout(attempt_timeout)
            .build();
        let conf = aws_sdk_sqs::config::Builder::from(sdk)
            .timeout_config(timeouts)
            .retry_config(RetryConfig::disabled())
            .build();
        Self {
            client: Client::from_conf(conf),
            queue_url: queue_url.to_string(),
            max_retries,
        }
    }

    /// Upper bound on one `send`: every attempt times out and every backoff
    /// sleep hits the cap. Jitter can add up to one more delay per sleep.
    pub fn worst_case(attempt_timeout: Duration, max_retries: usize) -> Duration {
        let retries = u32::try_from(max_retries).unwrap_or(u32::MAX);
        attempt_timeout.saturating_mul(retries.saturating_add(1))
            + RETRY_MAX_DELAY.saturating_mul(2).saturating_mul(retries)
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(RETRY_MIN_DELAY)
            .with_max_delay(RETRY_MAX_DELAY)
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    async fn send_once(&self, message_body: &str) -> Result<String, DispatchError> {
        let resp = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message_body)
            .send()
            .await
            .map_err(|e| sdk_error("SendMessage", e))?;
        Ok(resp.message_id().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl TaskQueue for SqsTaskQueue {
    async fn send(&self, message_body: &str) -> Result<String, DispatchError> {
        (|| async { self.send_once(message_body).await })
            .retry(self.retry_policy())
            .when(|e: &DispatchError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!(error = %err, "queue send retrying after {:?}", dur);
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_case_covers_attempts_and_backoff() {
        let attempt = Duration::from_secs(30);
        assert_eq!(SqsTaskQueue::worst_case(attempt, 0), attempt);
        // four attempts plus three capped, fully jittered sleeps
        assert_eq!(
            SqsTaskQueue::worst_case(attempt, 3),
            Duration::from_secs(4 * 30 + 3 * 6)
        );
    }
}
