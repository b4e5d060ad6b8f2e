//! `PublishFailureSink` implementation backed by the `publish_failures` table.

use async_trait::async_trait;
use coupon_core::PublishError;
use coupon_events::{IssuanceEvent, PublishFailureSink};
use sqlx::PgPool;
use tracing::error;

/// Records envelopes that exhausted publish retries so an operator job can
/// replay them later.
pub struct PostgresOutboxSink {
    pool: PgPool,
}

impl PostgresOutboxSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PublishFailureSink for PostgresOutboxSink {
    async fn record_failure(&self, event: &IssuanceEvent, error: &PublishError) {
        let payload = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(err) => {
                error!(%err, "failed to serialize envelope for outbox, dropping repair record");
                return;
            }
        };

        let insert = sqlx::query(
            "INSERT INTO publish_failures (envelope_id, event_id, payload, error) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (envelope_id) DO NOTHING",
        )
        .bind(event.envelope_id())
        .bind(event.event_id().as_str())
        .bind(payload)
        .bind(error.to_string())
        .execute(&self.pool)
        .await;

        if let Err(err) = insert {
            error!(%err, envelope_id = %event.envelope_id(), "failed to record publish failure to outbox");
        }
    }
}
