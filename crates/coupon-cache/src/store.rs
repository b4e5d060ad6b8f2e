//! The `KvStore` trait: the one seam between the admission script's
//! atomicity requirement and everything else.
//!
//! `admit` is a single call rather than decomposed get/set calls because
//! decomposing it would reopen the race the admission script exists to
//! close (§4.B).

use std::time::Duration;

use async_trait::async_trait;
use coupon_core::{CacheError, CouponId, EventId, UserId};

/// Outcome of a single admission attempt against the backend.
///
/// `remaining_stock` is the value the script itself observed while holding
/// the atomic section, not a separate read afterwards — a second read would
/// race the next concurrent `admit` and could report a stale count (§4.C
/// step 5 calls this out as non-authoritative once read any other way).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionResult {
    Issued {
        coupon_id: CouponId,
        remaining_stock: u64,
    },
    AlreadyParticipated {
        coupon_id: CouponId,
        remaining_stock: u64,
    },
    NoStockAvailable {
        remaining_stock: u64,
    },
    StockNotInitialized,
}

/// Backend abstraction for the admission-control KV store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically check-and-decrement stock, check-and-record participation,
    /// and assign `candidate_coupon_id` as the coupon for `user_id` on
    /// `event_id`. Implements spec §4.A steps 1-5 as one indivisible step,
    /// including the TTL refresh on `stock_key`/`participants_key` that
    /// step 4 requires on a successful admission.
    async fn admit(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        candidate_coupon_id: CouponId,
        ttl: Duration,
    ) -> Result<AdmissionResult, CacheError>;

    /// Seed the stock counter for `event_id` if it does not already exist.
    /// Returns `true` if this call initialized it, `false` if it was
    /// already present (set-if-not-exists semantics).
    async fn initialize_stock(
        &self,
        event_id: &EventId,
        stock: u64,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// Current remaining stock, or `None` if never initialized.
    async fn get_stock(&self, event_id: &EventId) -> Result<Option<u64>, CacheError>;

    /// Whether `user_id` has already participated in `event_id`.
    async fn is_user_participated(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<bool, CacheError>;

    /// Look up a cached coupon id for `user_id` on `event_id`.
    async fn get_user_coupon(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Option<CouponId>, CacheError>;

    /// Cache the coupon id assigned to `user_id` on `event_id`.
    async fn cache_user_coupon(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        coupon_id: CouponId,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Delete all cache entries for `event_id` (stock, participants, and
    /// every cached user-coupon key sharing its hash tag).
    async fn invalidate_event_cache(&self, event_id: &EventId) -> Result<(), CacheError>;

    /// Refresh the TTL on `event_id`'s stock and participant keys without
    /// changing their values.
    async fn touch(&self, event_id: &EventId, ttl: Duration) -> Result<(), CacheError>;
}

#[cfg(test)]
fn _assert_object_safe(_: &dyn KvStore) {}
