//! Property tests for §8 invariants 1–3, driven against the in-memory
//! `KvStore` fake with real `tokio` scheduler interleaving rather than a
//! sequential simulation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use coupon_cache::{AdmissionResult, InMemoryKvStore, KvStore};
use coupon_core::{CouponId, EventId, UserId};

const TTL: Duration = Duration::from_secs(60);

/// Invariant 1 — stock conservation: for N > S concurrent distinct users,
/// exactly S admissions succeed and N - S report no stock, and the final
/// remaining stock is zero.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stock_conservation_under_concurrent_distinct_users() {
    let store = Arc::new(InMemoryKvStore::new());
    let event_id = EventId::new("evt-conservation");
    const STOCK: u64 = 25;
    const USERS: u64 = 100;

    store.initialize_stock(&event_id, STOCK, TTL).await.unwrap();

    let mut handles = Vec::new();
    for n in 0..USERS {
        let store = store.clone();
        let event_id = event_id.clone();
        handles.push(tokio::spawn(async move {
            store
                .admit(&event_id, &UserId::new(format!("user-{n}")), CouponId::generate(), TTL)
                .await
                .unwrap()
        }));
    }

    let mut issued = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            AdmissionResult::Issued { .. } => issued += 1,
            AdmissionResult::NoStockAvailable { .. } => rejected += 1,
            other => panic!("unexpected admission result under distinct users: {other:?}"),
        }
    }

    assert_eq!(issued, STOCK);
    assert_eq!(rejected, USERS - STOCK);
    assert_eq!(store.get_stock(&event_id).await.unwrap(), Some(0));
}

/// Invariant 2 — per-user uniqueness: many concurrent repeated attempts
/// from the same user against the same event admit at most once; every
/// other attempt reports the same coupon id as already-participated.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn per_user_uniqueness_under_concurrent_repeated_attempts() {
    let store = Arc::new(InMemoryKvStore::new());
    let event_id = EventId::new("evt-uniqueness");
    let user_id = UserId::new("repeat-offender");
    const ATTEMPTS: usize = 50;

    store.initialize_stock(&event_id, 1000, TTL).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..ATTEMPTS {
        let store = store.clone();
        let event_id = event_id.clone();
        let user_id = user_id.clone();
        handles.push(tokio::spawn(async move {
            store.admit(&event_id, &user_id, CouponId::generate(), TTL).await.unwrap()
        }));
    }

    let mut issued_ids = HashSet::new();
    let mut already_participated_ids = HashSet::new();
    for handle in handles {
        match handle.await.unwrap() {
            AdmissionResult::Issued { coupon_id, .. } => {
                issued_ids.insert(coupon_id);
            }
            AdmissionResult::AlreadyParticipated { coupon_id, .. } => {
                already_participated_ids.insert(coupon_id);
            }
            other => panic!("unexpected admission result under repeated attempts: {other:?}"),
        }
    }

    assert_eq!(issued_ids.len(), 1, "exactly one attempt must be admitted");
    let winning_id = *issued_ids.iter().next().unwrap();
    assert_eq!(
        already_participated_ids,
        HashSet::from([winning_id]),
        "every duplicate must report the same coupon id as the winner"
    );
}

/// Invariant 3 — conservation equation: `|Participants| + remaining_stock
/// = total_stock` holds after a burst of concurrent admissions settles,
/// for every interleaving of distinct and repeated users.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn conservation_equation_holds_after_a_mixed_concurrent_burst() {
    let store = Arc::new(InMemoryKvStore::new());
    let event_id = EventId::new("evt-equation");
    const TOTAL_STOCK: u64 = 40;
    const DISTINCT_USERS: u64 = 60;
    const REPEATS_PER_USER: u64 = 3;

    store.initialize_stock(&event_id, TOTAL_STOCK, TTL).await.unwrap();

    let mut handles = Vec::new();
    for n in 0..DISTINCT_USERS {
        for _ in 0..REPEATS_PER_USER {
            let store = store.clone();
            let event_id = event_id.clone();
            let user_id = UserId::new(format!("user-{n}"));
            handles.push(tokio::spawn(async move {
                store.admit(&event_id, &user_id, CouponId::generate(), TTL).await.unwrap()
            }));
        }
    }

    let mut participants = HashSet::new();
    for (n, handle) in handles.into_iter().enumerate() {
        let user_id = UserId::new(format!("user-{}", n as u64 / REPEATS_PER_USER));
        match handle.await.unwrap() {
            AdmissionResult::Issued { .. } | AdmissionResult::AlreadyParticipated { .. } => {
                participants.insert(user_id);
            }
            AdmissionResult::NoStockAvailable { .. } => {}
            other => panic!("unexpected admission result under mixed burst: {other:?}"),
        }
    }

    let remaining = store.get_stock(&event_id).await.unwrap().unwrap();
    assert_eq!(participants.len() as u64 + remaining, TOTAL_STOCK);
    assert_eq!(remaining, TOTAL_STOCK.saturating_sub(DISTINCT_USERS));
}
