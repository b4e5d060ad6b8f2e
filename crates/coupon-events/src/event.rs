//! The durable event envelope
//!
//! A tagged enum instead of a dynamically-typed map (Design Notes): each
//! variant is a distinct, independently-typed payload, so a consumer match
//! arm that forgets a field is a compile error rather than a missing key at
//! runtime. The wire shape — top-level `event_id`/`event_type`/`timestamp`/
//! `version` with a nested `data` object — matches §6 and the original
//! source's `_create_event_message` exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coupon_core::{CouponId, EventId, UserId};

/// Unique identifier stamped on every published envelope, independent of
/// the domain `EventId` an issuance event concerns.
pub type EnvelopeId = Uuid;

/// Schema version stamped on every envelope (§6).
pub const SCHEMA_VERSION: &str = "1.0";

/// Payload of a `coupon_issued` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponIssuedData {
    pub user_id: UserId,
    pub event_id: EventId,
    pub coupon_id: CouponId,
    pub issued_at: DateTime<Utc>,
}

/// Payload of a `coupon_redeemed` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponRedeemedData {
    pub user_id: UserId,
    pub event_id: EventId,
    pub coupon_id: CouponId,
    pub redeemed_at: DateTime<Utc>,
}

/// Payload of a `stock_exhausted` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockExhaustedData {
    pub event_id: EventId,
    pub remaining_stock: u64,
    pub exhausted_at: DateTime<Utc>,
}

/// A single durable fact about the issuance pipeline, as published to the
/// log and consumed by the relational writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum IssuanceEvent {
    /// A coupon was newly admitted for `user_id` on `event_id`.
    CouponIssued {
        #[serde(rename = "event_id")]
        envelope_id: EnvelopeId,
        timestamp: DateTime<Utc>,
        version: String,
        data: CouponIssuedData,
    },

    /// A previously issued coupon was redeemed.
    CouponRedeemed {
        #[serde(rename = "event_id")]
        envelope_id: EnvelopeId,
        timestamp: DateTime<Utc>,
        version: String,
        data: CouponRedeemedData,
    },

    /// An event's stock counter reached zero.
    StockExhausted {
        #[serde(rename = "event_id")]
        envelope_id: EnvelopeId,
        timestamp: DateTime<Utc>,
        version: String,
        data: StockExhaustedData,
    },
}

impl IssuanceEvent {
    pub fn coupon_issued(event_id: EventId, user_id: UserId, coupon_id: CouponId) -> Self {
        IssuanceEvent::CouponIssued {
            envelope_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            version: SCHEMA_VERSION.to_string(),
            data: CouponIssuedData {
                user_id,
                event_id,
                coupon_id,
                issued_at: Utc::now(),
            },
        }
    }

    pub fn coupon_redeemed(event_id: EventId, user_id: UserId, coupon_id: CouponId) -> Self {
        IssuanceEvent::CouponRedeemed {
            envelope_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            version: SCHEMA_VERSION.to_string(),
            data: CouponRedeemedData {
                user_id,
                event_id,
                coupon_id,
                redeemed_at: Utc::now(),
            },
        }
    }

    pub fn stock_exhausted(event_id: EventId, remaining_stock: u64) -> Self {
        IssuanceEvent::StockExhausted {
            envelope_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            version: SCHEMA_VERSION.to_string(),
            data: StockExhaustedData {
                event_id,
                remaining_stock,
                exhausted_at: Utc::now(),
            },
        }
    }

    /// The domain event this envelope concerns — used to derive the
    /// partition key (§6: partitioned by `event_id`).
    pub fn event_id(&self) -> &EventId {
        match self {
            IssuanceEvent::CouponIssued { data, .. } => &data.event_id,
            IssuanceEvent::CouponRedeemed { data, .. } => &data.event_id,
            IssuanceEvent::StockExhausted { data, .. } => &data.event_id,
        }
    }

    pub fn envelope_id(&self) -> EnvelopeId {
        match self {
            IssuanceEvent::CouponIssued { envelope_id, .. }
            | IssuanceEvent::CouponRedeemed { envelope_id, .. }
            | IssuanceEvent::StockExhausted { envelope_id, .. } => *envelope_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            IssuanceEvent::CouponIssued { timestamp, .. }
            | IssuanceEvent::CouponRedeemed { timestamp, .. }
            | IssuanceEvent::StockExhausted { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_issued_carries_its_own_event_id_for_partitioning() {
        let event_id = EventId::new("evt-1");
        let envelope = IssuanceEvent::coupon_issued(
            event_id.clone(),
            UserId::new("u1"),
            CouponId::generate(),
        );
        assert_eq!(envelope.event_id(), &event_id);
    }

    #[test]
    fn envelope_roundtrips_through_json_with_the_wire_shape_from_the_spec() {
        let envelope = IssuanceEvent::stock_exhausted(EventId::new("evt-1"), 0);
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"event_type\":\"stock_exhausted\""));
        assert!(json.contains("\"version\":\"1.0\""));
        assert!(json.contains("\"data\":"));
        let decoded: IssuanceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, envelope);
    }
}
