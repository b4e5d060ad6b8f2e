//! In-memory [`EventPublisher`] fake
//!
//! Records every published envelope, grouped by partition key (`event_id`),
//! in the order `publish` was called — enough to assert log fidelity and
//! per-event ordering (§8) without a running broker.

use async_trait::async_trait;
use coupon_core::PublishError;
use dashmap::DashMap;

use crate::event::IssuanceEvent;
use crate::publisher::EventPublisher;

/// `EventPublisher` fake that appends to an in-memory, per-partition log.
#[derive(Default)]
pub struct ChannelPublisher {
    partitions: DashMap<String, Vec<IssuanceEvent>>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded for a given partition key, in publish order.
    pub fn events_for(&self, partition_key: &str) -> Vec<IssuanceEvent> {
        self.partitions
            .get(partition_key)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Every event recorded across all partitions, in the order each
    /// partition first appeared then in per-partition publish order. Useful
    /// for a total count, not for asserting cross-partition ordering (the
    /// log makes no such guarantee — §5).
    pub fn all_events(&self) -> Vec<IssuanceEvent> {
        self.partitions
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, event: IssuanceEvent) -> Result<(), PublishError> {
        let key = event.event_id().to_string();
        self.partitions.entry(key).or_default().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coupon_core::{CouponId, EventId, UserId};

    #[tokio::test]
    async fn events_are_recorded_in_publish_order_per_partition() {
        let publisher = ChannelPublisher::new();
        let event_id = EventId::new("evt-1");

        let first = IssuanceEvent::coupon_issued(event_id.clone(), UserId::new("u1"), CouponId::generate());
        let second = IssuanceEvent::coupon_issued(event_id.clone(), UserId::new("u2"), CouponId::generate());
        publisher.publish(first.clone()).await.unwrap();
        publisher.publish(second.clone()).await.unwrap();

        let recorded = publisher.events_for(event_id.as_str());
        assert_eq!(recorded, vec![first, second]);
    }

    #[tokio::test]
    async fn distinct_event_ids_land_in_distinct_partitions() {
        let publisher = ChannelPublisher::new();
        publisher
            .publish(IssuanceEvent::stock_exhausted(EventId::new("evt-1"), 0))
            .await
            .unwrap();
        publisher
            .publish(IssuanceEvent::stock_exhausted(EventId::new("evt-2"), 0))
            .await
            .unwrap();

        assert_eq!(publisher.events_for("evt-1").len(), 1);
        assert_eq!(publisher.events_for("evt-2").len(), 1);
    }
}
