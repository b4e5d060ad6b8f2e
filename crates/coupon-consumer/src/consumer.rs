//! Poll-process-commit loop
//!
//! Mirrors the original source's consumer main loop: poll a bounded batch,
//! apply every message to the relational store, and only then commit
//! offsets — with `enable.auto.commit=false` so a crash mid-batch replays
//! the whole batch rather than silently skipping it. Idempotent writes in
//! [`RelationalStore`] make that replay safe.

use std::time::Duration;

use coupon_core::ConsumerError;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use coupon_events::IssuanceEvent;

use crate::relational::RelationalStore;

const TOPIC: &str = "coupon-issuance-events";

/// Kafka-backed event consumer driving the eventual-persistence pipeline.
pub struct EventConsumer {
    consumer: StreamConsumer,
    store: RelationalStore,
}

impl EventConsumer {
    pub fn new(
        brokers: &[String],
        group_id: &str,
        store: RelationalStore,
    ) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|err| ConsumerError::Connection(err.to_string()))?;

        consumer
            .subscribe(&[TOPIC])
            .map_err(|err| ConsumerError::Connection(err.to_string()))?;

        Ok(Self { consumer, store })
    }

    /// Run the poll-process-commit loop until `shutdown` reports `true`.
    pub async fn run(
        &self,
        batch_size: u32,
        poll_timeout: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ConsumerError> {
        loop {
            if *shutdown.borrow() {
                info!("shutdown signaled, stopping consumer loop");
                return Ok(());
            }

            let processed = tokio::select! {
                biased;
                _ = shutdown.changed() => 0,
                processed = self.poll_batch(batch_size, poll_timeout) => processed?,
            };

            if processed > 0 {
                self.consumer
                    .commit_consumer_state(CommitMode::Async)
                    .map_err(|_| ConsumerError::CommitFailed)?;
                debug!(processed, "committed batch offsets");
            }
        }
    }

    async fn poll_batch(&self, batch_size: u32, poll_timeout: Duration) -> Result<u32, ConsumerError> {
        let mut processed = 0;
        while processed < batch_size {
            match tokio::time::timeout(poll_timeout, self.consumer.recv()).await {
                Ok(Ok(message)) => {
                    self.process_message(&message).await?;
                    self.consumer
                        .store_offset_from_message(&message)
                        .map_err(|_| ConsumerError::CommitFailed)?;
                    processed += 1;
                }
                Ok(Err(err)) => {
                    warn!(%err, "error receiving from broker, continuing");
                }
                Err(_) => break,
            }
        }
        Ok(processed)
    }

    async fn process_message(&self, message: &rdkafka::message::BorrowedMessage<'_>) -> Result<(), ConsumerError> {
        let payload = message.payload().ok_or_else(|| {
            ConsumerError::Decode(serde_json::Error::io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "message had no payload",
            )))
        })?;
        let event: IssuanceEvent = serde_json::from_slice(payload)?;
        self.store.apply(&event).await
    }
}
