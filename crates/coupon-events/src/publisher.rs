//! `EventPublisher`: the durable-log seam

use async_trait::async_trait;
use coupon_core::PublishError;

use crate::event::IssuanceEvent;

/// Appends [`IssuanceEvent`]s to the durable log, partitioned by
/// `event_id` so every event concerning one coupon event is ordered
/// relative to the others (§6).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: IssuanceEvent) -> Result<(), PublishError>;
}

#[cfg(test)]
fn _assert_object_safe(_: &dyn EventPublisher) {}
