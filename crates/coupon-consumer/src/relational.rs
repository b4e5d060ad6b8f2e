//! Postgres-backed relational store
//!
//! Idempotency for consumer replay (§8 property 5) comes entirely from the
//! unique constraints in the migration plus `ON CONFLICT DO NOTHING` /
//! conditional `UPDATE` — there is no separate idempotency-tracking table.
//! A unique-violation (Postgres code `23505`) on a duplicate insert is
//! treated as the successful-duplicate case, mirroring the original
//! source's reliance on catching `IntegrityError`/"Duplicate entry".

use coupon_core::ConsumerError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, instrument};

use coupon_events::IssuanceEvent;

const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION))
}

/// Relational writer for the three tables the consumer maintains plus the
/// publish-failure outbox.
#[derive(Clone)]
pub struct RelationalStore {
    pool: PgPool,
}

impl RelationalStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, ConsumerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an already-established pool (used by `#[sqlx::test]` harnesses,
    /// which provision and migrate a scratch database per test).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), ConsumerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| ConsumerError::Connection(err.to_string()))
    }

    /// Apply a single [`IssuanceEvent`] to the relational store. Returns
    /// `Ok(())` both for a fresh write and for a duplicate that was already
    /// applied — replaying the same envelope twice must be a no-op, never
    /// an error (§8 property 5).
    #[instrument(skip(self, event))]
    pub async fn apply(&self, event: &IssuanceEvent) -> Result<(), ConsumerError> {
        match event {
            IssuanceEvent::CouponIssued { data, .. } => {
                self.apply_coupon_issued(data.event_id.as_str(), data.user_id.as_str(), data.coupon_id.as_uuid())
                    .await
            }
            IssuanceEvent::CouponRedeemed { data, .. } => {
                self.apply_coupon_redeemed(data.event_id.as_str(), data.user_id.as_str(), data.coupon_id.as_uuid())
                    .await
            }
            IssuanceEvent::StockExhausted { data, .. } => {
                self.apply_stock_exhausted(data.event_id.as_str(), data.remaining_stock).await
            }
        }
    }

    async fn apply_coupon_issued(
        &self,
        event_id: &str,
        user_id: &str,
        coupon_id: uuid::Uuid,
    ) -> Result<(), ConsumerError> {
        let result = sqlx::query(
            "INSERT INTO user_coupons (coupon_id, event_id, user_id) VALUES ($1, $2, $3)",
        )
        .bind(coupon_id)
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                debug!(event_id, user_id, "coupon_issued already applied, treating as success");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_coupon_redeemed(
        &self,
        event_id: &str,
        user_id: &str,
        coupon_id: uuid::Uuid,
    ) -> Result<(), ConsumerError> {
        sqlx::query(
            "UPDATE user_coupons SET is_used = TRUE, used_at = now() \
             WHERE coupon_id = $1 AND event_id = $2 AND user_id = $3 AND is_used = FALSE",
        )
        .bind(coupon_id)
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let result = sqlx::query(
            "INSERT INTO coupon_usage (coupon_id, event_id, user_id) VALUES ($1, $2, $3)",
        )
        .bind(coupon_id)
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_stock_exhausted(&self, event_id: &str, remaining_stock: u64) -> Result<(), ConsumerError> {
        sqlx::query(
            "UPDATE coupon_events SET remaining_stock = $2, is_active = FALSE, updated_at = now() \
             WHERE event_id = $1",
        )
        .bind(event_id)
        .bind(remaining_stock as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete repair records older than `retention`. Wired nowhere
    /// automatically; an operator job or `coupon-worker` can call it.
    pub async fn cleanup_stale(&self, retention: chrono::Duration) -> Result<u64, ConsumerError> {
        let cutoff = chrono::Utc::now() - retention;
        let result = sqlx::query(
            "DELETE FROM publish_failures WHERE resolved_at IS NOT NULL AND recorded_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
