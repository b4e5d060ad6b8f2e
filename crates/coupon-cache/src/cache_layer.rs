//! `CacheLayer`: key derivation and TTL policy on top of a [`KvStore`]
//!
//! `CacheLayer` owns no I/O of its own — every operation delegates straight
//! to its backend. What it owns is the policy: which TTL applies to which
//! key, and assembling the backend's raw admission result into the
//! `(coupon_id, newly_issued)` pair callers actually want.

use std::sync::Arc;
use std::time::Duration;

use coupon_core::{CacheError, CouponId, EventId, UserId};
use tracing::instrument;

use crate::store::{AdmissionResult, KvStore};

/// TTL policy for the three kinds of cache entry this layer manages.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    pub stock: Duration,
    pub participants: Duration,
    pub user_coupon: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            stock: Duration::from_secs(3600),
            participants: Duration::from_secs(3600),
            user_coupon: Duration::from_secs(3600),
        }
    }
}

/// Policy-and-key-derivation wrapper over a [`KvStore`] backend.
pub struct CacheLayer<K: KvStore> {
    backend: Arc<K>,
    ttl: TtlPolicy,
}

impl<K: KvStore> CacheLayer<K> {
    pub fn new(backend: Arc<K>, ttl: TtlPolicy) -> Self {
        Self { backend, ttl }
    }

    /// Seed `event_id`'s stock counter if it hasn't been already. Returns
    /// `true` if this call performed the seed.
    #[instrument(skip(self))]
    pub async fn initialize_stock(&self, event_id: &EventId, stock: u64) -> Result<bool, CacheError> {
        self.backend
            .initialize_stock(event_id, stock, self.ttl.stock)
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_stock(&self, event_id: &EventId) -> Result<Option<u64>, CacheError> {
        self.backend.get_stock(event_id).await
    }

    #[instrument(skip(self))]
    pub async fn is_user_participated(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<bool, CacheError> {
        self.backend.is_user_participated(event_id, user_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_user_coupon(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Option<CouponId>, CacheError> {
        self.backend.get_user_coupon(event_id, user_id).await
    }

    #[instrument(skip(self))]
    pub async fn cache_user_coupon(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        coupon_id: CouponId,
    ) -> Result<(), CacheError> {
        self.backend
            .cache_user_coupon(event_id, user_id, coupon_id, self.ttl.user_coupon)
            .await
    }

    #[instrument(skip(self))]
    pub async fn invalidate_event_cache(&self, event_id: &EventId) -> Result<(), CacheError> {
        self.backend.invalidate_event_cache(event_id).await
    }

    /// Refresh the stock/participant TTLs for a long-running event. Exposed
    /// for an operator job or a future background task to call; nothing in
    /// this workspace invokes it automatically.
    #[instrument(skip(self))]
    pub async fn touch(&self, event_id: &EventId) -> Result<(), CacheError> {
        self.backend.touch(event_id, self.ttl.stock).await
    }

    /// Run the atomic admission check for `user_id` on `event_id`, caching
    /// the resulting coupon id on success.
    #[instrument(skip(self))]
    pub async fn admit(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        candidate_coupon_id: CouponId,
    ) -> Result<AdmissionResult, CacheError> {
        let result = self
            .backend
            .admit(event_id, user_id, candidate_coupon_id, self.ttl.stock)
            .await?;

        if let AdmissionResult::Issued { coupon_id, .. } = result {
            self.cache_user_coupon(event_id, user_id, coupon_id).await?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryKvStore;

    fn layer() -> CacheLayer<InMemoryKvStore> {
        CacheLayer::new(Arc::new(InMemoryKvStore::new()), TtlPolicy::default())
    }

    #[tokio::test]
    async fn admit_caches_the_issued_coupon_id() {
        let layer = layer();
        let event_id = EventId::new("evt-1");
        let user_id = UserId::new("u1");
        layer.initialize_stock(&event_id, 5).await.unwrap();

        let coupon_id = CouponId::generate();
        let result = layer.admit(&event_id, &user_id, coupon_id).await.unwrap();
        assert_eq!(
            result,
            AdmissionResult::Issued { coupon_id, remaining_stock: 4 }
        );

        let cached = layer.get_user_coupon(&event_id, &user_id).await.unwrap();
        assert_eq!(cached, Some(coupon_id));
    }

    #[tokio::test]
    async fn second_initialize_stock_call_is_a_noop() {
        let layer = layer();
        let event_id = EventId::new("evt-1");
        assert!(layer.initialize_stock(&event_id, 5).await.unwrap());
        assert!(!layer.initialize_stock(&event_id, 999).await.unwrap());
        assert_eq!(layer.get_stock(&event_id).await.unwrap(), Some(5));
    }
}
