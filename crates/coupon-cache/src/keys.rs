//! KV key derivation
//!
//! All keys for a given event carry a `{event_id}` hash tag so Redis Cluster
//! places them in the same slot — required for the admission script (§4.A)
//! to run atomically across the stock counter and participant set.

use coupon_core::{EventId, UserId};

/// Stock counter key: `coupon:stock:{event_id}`.
pub fn stock_key(event_id: &EventId) -> String {
    format!("coupon:stock:{{{event_id}}}")
}

/// Participant set key: `coupon:participants:{event_id}`.
pub fn participants_key(event_id: &EventId) -> String {
    format!("coupon:participants:{{{event_id}}}")
}

/// Per-user coupon-id cache key: `coupon:user:{user_id}:{event_id}`.
pub fn user_coupon_key(user_id: &UserId, event_id: &EventId) -> String {
    format!("coupon:user:{{{event_id}}}:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_and_participants_keys_share_a_hash_tag() {
        let event_id = EventId::new("summer-sale");
        let stock = stock_key(&event_id);
        let participants = participants_key(&event_id);
        assert!(stock.contains("{summer-sale}"));
        assert!(participants.contains("{summer-sale}"));
    }

    #[test]
    fn user_coupon_key_is_tagged_by_event_not_user() {
        let event_id = EventId::new("summer-sale");
        let user_id = UserId::new("alice");
        let key = user_coupon_key(&user_id, &event_id);
        assert!(key.contains("{summer-sale}"));
    }
}
