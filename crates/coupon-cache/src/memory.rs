//! In-memory `KvStore` fake
//!
//! Reproduces the admission script's step-by-step semantics without a
//! running Redis Cluster, so `coupon-coordinator` and the property tests in
//! `tests/` can drive many concurrent `tokio::task`s against real scheduler
//! interleaving instead of a sequential simulation.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use coupon_core::{CacheError, CouponId, EventId, UserId};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::keys::{participants_key, stock_key, user_coupon_key};
use crate::store::{AdmissionResult, KvStore};

struct StockEntry {
    remaining: i64,
    expires_at: Option<Instant>,
}

impl StockEntry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) => now < at,
            None => true,
        }
    }
}

/// In-memory admission-control store, one mutex-guarded slot per key to
/// keep `admit` indivisible the same way the Lua script is on the real
/// backend.
pub struct InMemoryKvStore {
    stock: DashMap<String, StockEntry>,
    participants: DashMap<String, HashSet<UserId>>,
    participants_expires_at: DashMap<String, Instant>,
    participant_coupons: DashMap<String, CouponId>,
    user_coupons: DashMap<String, (CouponId, Option<Instant>)>,
    admit_lock: Mutex<()>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self {
            stock: DashMap::new(),
            participants: DashMap::new(),
            participants_expires_at: DashMap::new(),
            participant_coupons: DashMap::new(),
            user_coupons: DashMap::new(),
            admit_lock: Mutex::new(()),
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn admit(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        candidate_coupon_id: CouponId,
        ttl: Duration,
    ) -> Result<AdmissionResult, CacheError> {
        // A single global lock serializes `admit` the way the Lua script is
        // serialized by Redis's single-threaded script executor. It is
        // coarser than per-event locking, which is fine: this store exists
        // for tests, not for throughput.
        let _guard = self.admit_lock.lock().await;

        let stock_k = stock_key(event_id);
        let participants_k = participants_key(event_id);
        let participant_coupon_k = format!("{stock_k}:participant_coupons:{user_id}");

        let mut entry = match self.stock.get_mut(&stock_k) {
            Some(entry) if entry.is_live(Instant::now()) => entry,
            _ => {
                trace!(%event_id, "admit: stock not initialized");
                return Ok(AdmissionResult::StockNotInitialized);
            }
        };

        let already_participated = self
            .participants
            .get(&participants_k)
            .map(|set| set.contains(user_id))
            .unwrap_or(false);

        if already_participated {
            let existing = self
                .participant_coupons
                .get(&participant_coupon_k)
                .map(|c| *c)
                .expect("participant recorded without a coupon id");
            debug!(%event_id, %user_id, "admit: user already participated");
            return Ok(AdmissionResult::AlreadyParticipated {
                coupon_id: existing,
                remaining_stock: entry.remaining.max(0) as u64,
            });
        }

        if entry.remaining <= 0 {
            trace!(%event_id, "admit: no stock remaining");
            return Ok(AdmissionResult::NoStockAvailable { remaining_stock: 0 });
        }

        let now = Instant::now();
        entry.remaining -= 1;
        entry.expires_at = Some(now + ttl);
        let remaining_stock = entry.remaining.max(0) as u64;
        drop(entry);

        self.participants
            .entry(participants_k.clone())
            .or_default()
            .insert(user_id.clone());
        self.participants_expires_at.insert(participants_k, now + ttl);
        self.participant_coupons
            .insert(participant_coupon_k, candidate_coupon_id);

        debug!(%event_id, %user_id, %candidate_coupon_id, "admit: issued");
        Ok(AdmissionResult::Issued {
            coupon_id: candidate_coupon_id,
            remaining_stock,
        })
    }

    async fn initialize_stock(
        &self,
        event_id: &EventId,
        stock: u64,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let key = stock_key(event_id);
        let now = Instant::now();
        if let Some(existing) = self.stock.get(&key) {
            if existing.is_live(now) {
                return Ok(false);
            }
        }
        self.stock.insert(
            key,
            StockEntry {
                remaining: stock as i64,
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn get_stock(&self, event_id: &EventId) -> Result<Option<u64>, CacheError> {
        let key = stock_key(event_id);
        let now = Instant::now();
        Ok(self.stock.get(&key).and_then(|entry| {
            if entry.is_live(now) {
                Some(entry.remaining.max(0) as u64)
            } else {
                None
            }
        }))
    }

    async fn is_user_participated(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<bool, CacheError> {
        let key = participants_key(event_id);
        Ok(self
            .participants
            .get(&key)
            .map(|set| set.contains(user_id))
            .unwrap_or(false))
    }

    async fn get_user_coupon(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Option<CouponId>, CacheError> {
        let key = user_coupon_key(user_id, event_id);
        let now = Instant::now();
        Ok(self.user_coupons.get(&key).and_then(|(coupon_id, expiry)| {
            match expiry {
                Some(at) if now >= *at => None,
                _ => Some(*coupon_id),
            }
        }))
    }

    async fn cache_user_coupon(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        coupon_id: CouponId,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = user_coupon_key(user_id, event_id);
        self.user_coupons
            .insert(key, (coupon_id, Some(Instant::now() + ttl)));
        Ok(())
    }

    async fn invalidate_event_cache(&self, event_id: &EventId) -> Result<(), CacheError> {
        let stock_k = stock_key(event_id);
        let participants_k = participants_key(event_id);
        self.stock.remove(&stock_k);
        self.participants.remove(&participants_k);
        self.participants_expires_at.remove(&participants_k);
        self.participant_coupons
            .retain(|key, _| !key.starts_with(&format!("{stock_k}:participant_coupons:")));
        let prefix = format!("coupon:user:{{{event_id}}}:");
        self.user_coupons.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn touch(&self, event_id: &EventId, ttl: Duration) -> Result<(), CacheError> {
        let stock_k = stock_key(event_id);
        let participants_k = participants_key(event_id);
        let now = Instant::now();
        if let Some(mut entry) = self.stock.get_mut(&stock_k) {
            entry.expires_at = Some(now + ttl);
        }
        if self.participants_expires_at.contains_key(&participants_k) {
            self.participants_expires_at.insert(participants_k, now + ttl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> EventId {
        EventId::new("evt-1")
    }

    #[tokio::test]
    async fn initialize_stock_is_set_if_not_exists() {
        let store = InMemoryKvStore::new();
        let e = event();
        assert!(store.initialize_stock(&e, 5, Duration::from_secs(60)).await.unwrap());
        assert!(!store.initialize_stock(&e, 999, Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.get_stock(&e).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn admit_without_initialized_stock_reports_not_initialized() {
        let store = InMemoryKvStore::new();
        let result = store
            .admit(&event(), &UserId::new("u1"), CouponId::generate(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(result, AdmissionResult::StockNotInitialized);
    }

    #[tokio::test]
    async fn admit_returns_the_post_decrement_remaining_stock() {
        let store = InMemoryKvStore::new();
        let e = event();
        store.initialize_stock(&e, 5, Duration::from_secs(60)).await.unwrap();

        let result = store
            .admit(&e, &UserId::new("u1"), CouponId::generate(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            result,
            AdmissionResult::Issued { remaining_stock: 4, .. }
        ));
    }

    #[tokio::test]
    async fn admit_decrements_stock_and_is_idempotent_per_user() {
        let store = InMemoryKvStore::new();
        let e = event();
        store.initialize_stock(&e, 1, Duration::from_secs(60)).await.unwrap();
        let user = UserId::new("u1");

        let first = store.admit(&e, &user, CouponId::generate(), Duration::from_secs(60)).await.unwrap();
        let AdmissionResult::Issued { coupon_id, .. } = first else {
            panic!("expected Issued, got {first:?}");
        };

        let second = store.admit(&e, &user, CouponId::generate(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(
            second,
            AdmissionResult::AlreadyParticipated { coupon_id, remaining_stock: 0 }
        );
        assert_eq!(store.get_stock(&e).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn admit_refreshes_the_stock_ttl_on_success() {
        let store = InMemoryKvStore::new();
        let e = event();
        store.initialize_stock(&e, 1, Duration::from_millis(50)).await.unwrap();

        store
            .admit(&e, &UserId::new("u1"), CouponId::generate(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        // The short initial TTL would have expired the key by now had admit
        // not refreshed it to the longer duration it was passed (§4.A step 4).
        assert_eq!(store.get_stock(&e).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn admit_reports_no_stock_for_a_second_distinct_user() {
        let store = InMemoryKvStore::new();
        let e = event();
        store.initialize_stock(&e, 1, Duration::from_secs(60)).await.unwrap();
        store.admit(&e, &UserId::new("u1"), CouponId::generate(), Duration::from_secs(60)).await.unwrap();

        let result = store
            .admit(&e, &UserId::new("u2"), CouponId::generate(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(result, AdmissionResult::NoStockAvailable { remaining_stock: 0 });
    }

    #[tokio::test]
    async fn invalidate_event_cache_clears_stock_and_participants() {
        let store = InMemoryKvStore::new();
        let e = event();
        store.initialize_stock(&e, 1, Duration::from_secs(60)).await.unwrap();
        store.admit(&e, &UserId::new("u1"), CouponId::generate(), Duration::from_secs(60)).await.unwrap();

        store.invalidate_event_cache(&e).await.unwrap();

        assert_eq!(store.get_stock(&e).await.unwrap(), None);
        assert!(!store.is_user_participated(&e, &UserId::new("u1")).await.unwrap());
    }
}
