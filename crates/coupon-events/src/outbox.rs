//! Publish-after-commit repair
//!
//! The admission script can succeed while the subsequent publish to the log
//! fails or times out (§7/§9). [`FallbackPublisher`] retries a bounded
//! number of times, then hands the envelope to a [`PublishFailureSink`] so
//! it is durably recorded for an operator job to replay — instead of
//! silently dropping it or blocking the caller indefinitely.

use std::time::Duration;

use async_trait::async_trait;
use coupon_core::PublishError;
use tracing::{error, warn};

use crate::event::IssuanceEvent;
use crate::publisher::EventPublisher;

/// Durable record of an envelope that could not be published after
/// exhausting retries, for later operator-driven replay.
#[async_trait]
pub trait PublishFailureSink: Send + Sync {
    async fn record_failure(&self, event: &IssuanceEvent, error: &PublishError);
}

/// Wraps an [`EventPublisher`], retrying on failure before recording an
/// unrecoverable publish to `sink`.
pub struct FallbackPublisher<P, S> {
    inner: P,
    sink: S,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl<P: EventPublisher, S: PublishFailureSink> FallbackPublisher<P, S> {
    pub fn new(inner: P, sink: S) -> Self {
        Self {
            inner,
            sink,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, retry_backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_backoff = retry_backoff;
        self
    }
}

#[async_trait]
impl<P: EventPublisher, S: PublishFailureSink> EventPublisher for FallbackPublisher<P, S> {
    async fn publish(&self, event: IssuanceEvent) -> Result<(), PublishError> {
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            match self.inner.publish(event.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(attempt, %err, "publish attempt failed");
                    last_err = Some(err);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
            }
        }

        let err = last_err.expect("loop runs at least once");
        error!(envelope_id = %event.envelope_id(), %err, "publish retries exhausted, recording to outbox");
        self.sink.record_failure(&event, &err).await;
        Err(err)
    }
}
