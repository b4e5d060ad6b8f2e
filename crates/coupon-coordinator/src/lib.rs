//! Issuance orchestration.
//!
//! [`IssuanceCoordinator`] is constructed once at service start with its
//! dependencies already built (`Arc<CacheLayer<_>>`, `Arc<dyn
//! EventPublisher>`) and passed down — no process-wide lazy statics
//! (Design Notes). `issue` runs the full protocol from §4.C under a
//! per-request deadline.

use std::sync::Arc;
use std::time::Duration;

use coupon_cache::{AdmissionResult, CacheLayer, KvStore};
use coupon_core::{CoordinatorError, CouponId, EventId, IssuanceOutcome, UserId};
use coupon_events::{EventPublisher, IssuanceEvent};
use tracing::{instrument, warn};

/// Orchestrates a single issuance request: seed stock if absent, run the
/// atomic admission check, publish the resulting event, and shape the
/// outcome — all within `deadline`.
pub struct IssuanceCoordinator<K: KvStore> {
    cache: Arc<CacheLayer<K>>,
    publisher: Arc<dyn EventPublisher>,
    deadline: Duration,
    default_initial_stock: u64,
    auto_seed: bool,
}

impl<K: KvStore> IssuanceCoordinator<K> {
    pub fn new(
        cache: Arc<CacheLayer<K>>,
        publisher: Arc<dyn EventPublisher>,
        deadline: Duration,
        default_initial_stock: u64,
    ) -> Self {
        Self {
            cache,
            publisher,
            deadline,
            default_initial_stock,
            auto_seed: true,
        }
    }

    /// Disable the convenience-seed path (§4.C step 1): an `issue` call
    /// against an event whose stock was never explicitly initialized
    /// returns `StockNotInitialized` instead of auto-seeding it.
    pub fn without_auto_seed(mut self) -> Self {
        self.auto_seed = false;
        self
    }

    /// Run the full issuance protocol for `user_id` requesting a coupon on
    /// `event_id`.
    ///
    /// On timeout, rather than guess whether admission landed, this probes
    /// the cached user-coupon entry once: if the user already holds a
    /// coupon it is reported as a success (the request evidently landed
    /// despite the slow round trip); otherwise `CoordinatorError::Timeout`
    /// is returned and the caller must not assume a coupon was *not*
    /// issued — only that this call could not confirm it (§9).
    #[instrument(skip(self))]
    pub async fn issue(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<IssuanceOutcome, CoordinatorError> {
        match tokio::time::timeout(self.deadline, self.issue_inner(&event_id, &user_id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%event_id, %user_id, "issuance request timed out, probing for a landed admission");
                match self.cache.get_user_coupon(&event_id, &user_id).await {
                    Ok(Some(coupon_id)) => Ok(IssuanceOutcome::UserAlreadyParticipated { coupon_id }),
                    _ => Err(CoordinatorError::Timeout),
                }
            }
        }
    }

    /// Seed `event_id`'s stock counter directly, bypassing the
    /// auto-seed-on-first-request path. Used by admin tooling
    /// (`POST /admin/events/{event_id}/stock`) and by tests that need a
    /// specific stock value rather than the configured default.
    #[instrument(skip(self))]
    pub async fn seed_stock(&self, event_id: &EventId, stock: u64) -> Result<bool, CoordinatorError> {
        Ok(self.cache.initialize_stock(event_id, stock).await?)
    }

    async fn issue_inner(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<IssuanceOutcome, CoordinatorError> {
        if self.cache.get_stock(event_id).await?.is_none() {
            if !self.auto_seed {
                return Ok(IssuanceOutcome::StockNotInitialized);
            }
            self.cache
                .initialize_stock(event_id, self.default_initial_stock)
                .await?;
        }

        let candidate_coupon_id = CouponId::generate();
        let result = self
            .cache
            .admit(event_id, user_id, candidate_coupon_id)
            .await?;

        match result {
            AdmissionResult::Issued { coupon_id, remaining_stock } => {
                // A publish failure here must not fail a request the
                // admission script already committed. The coupon exists in
                // the cache regardless of whether the event makes it to the
                // log; the gap is repaired out-of-band via the
                // `publish_failures` outbox (§9).
                if let Err(err) = self
                    .publisher
                    .publish(IssuanceEvent::coupon_issued(
                        event_id.clone(),
                        user_id.clone(),
                        coupon_id,
                    ))
                    .await
                {
                    warn!(%event_id, %user_id, %err, "failed to publish coupon-issued event");
                }

                if remaining_stock == 0 {
                    if let Err(err) = self
                        .publisher
                        .publish(IssuanceEvent::stock_exhausted(event_id.clone(), remaining_stock))
                        .await
                    {
                        warn!(%event_id, %err, "failed to publish stock-exhausted signal");
                    }
                }

                Ok(IssuanceOutcome::Issued { coupon_id, remaining_stock })
            }
            AdmissionResult::AlreadyParticipated { coupon_id, remaining_stock } => {
                Ok(IssuanceOutcome::UserAlreadyParticipated { coupon_id, remaining_stock })
            }
            AdmissionResult::NoStockAvailable { remaining_stock } => {
                Ok(IssuanceOutcome::NoStockAvailable { remaining_stock })
            }
            AdmissionResult::StockNotInitialized => Ok(IssuanceOutcome::StockNotInitialized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coupon_cache::{InMemoryKvStore, TtlPolicy};
    use coupon_events::ChannelPublisher;

    fn coordinator() -> (IssuanceCoordinator<InMemoryKvStore>, Arc<ChannelPublisher>) {
        let cache = Arc::new(CacheLayer::new(
            Arc::new(InMemoryKvStore::new()),
            TtlPolicy::default(),
        ));
        let publisher = Arc::new(ChannelPublisher::new());
        let coordinator = IssuanceCoordinator::new(
            cache,
            publisher.clone(),
            Duration::from_secs(5),
            1000,
        );
        (coordinator, publisher)
    }

    #[tokio::test]
    async fn first_request_auto_seeds_stock_and_issues_a_coupon() {
        let (coordinator, publisher) = coordinator();
        let event_id = EventId::new("evt-1");

        let outcome = coordinator
            .issue(event_id.clone(), UserId::new("u1"))
            .await
            .unwrap();

        assert!(matches!(outcome, IssuanceOutcome::Issued { .. }));
        assert_eq!(publisher.events_for(event_id.as_str()).len(), 1);
    }

    #[tokio::test]
    async fn repeat_request_from_same_user_returns_the_same_coupon() {
        let (coordinator, _publisher) = coordinator();
        let event_id = EventId::new("evt-1");
        let user_id = UserId::new("u1");

        let first = coordinator.issue(event_id.clone(), user_id.clone()).await.unwrap();
        let second = coordinator.issue(event_id.clone(), user_id.clone()).await.unwrap();

        assert_eq!(first.coupon_id(), second.coupon_id());
        assert!(matches!(second, IssuanceOutcome::UserAlreadyParticipated { .. }));
    }

    #[tokio::test]
    async fn exhausted_stock_publishes_a_stock_exhausted_event() {
        let (coordinator, publisher) = coordinator();
        let event_id = EventId::new("evt-1");
        coordinator.seed_stock(&event_id, 1).await.unwrap();

        coordinator.issue(event_id.clone(), UserId::new("u1")).await.unwrap();
        let second = coordinator.issue(event_id.clone(), UserId::new("u2")).await.unwrap();

        assert_eq!(second, IssuanceOutcome::NoStockAvailable { remaining_stock: 0 });
        let recorded = publisher.events_for(event_id.as_str());
        assert!(recorded
            .iter()
            .any(|e| matches!(e, IssuanceEvent::StockExhausted { .. })));
    }
}
