//! Newtype identifiers for the coupon issuance domain
//!
//! `EventId` and `UserId` both wrap a `String`; keeping them as distinct
//! types (rather than passing two bare `&str`s around) stops the coordinator
//! and cache call sites from silently swapping the two.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a coupon event (`event_id` throughout the spec).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier for an end user (`user_id` throughout the spec).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque 128-bit coupon identifier.
///
/// UUIDv4 satisfies §4.C's "universally unique, cryptographically random or
/// time-ordered; collisions must be infeasible" requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponId(Uuid);

impl CouponId {
    /// Generate a fresh candidate coupon id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CouponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CouponId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for CouponId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_ids_are_unique() {
        let a = CouponId::generate();
        let b = CouponId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn event_and_user_id_display_is_the_raw_string() {
        let e = EventId::new("e1");
        let u = UserId::new("u1");
        assert_eq!(e.to_string(), "e1");
        assert_eq!(u.to_string(), "u1");
    }

    #[test]
    fn coupon_id_roundtrips_through_string() {
        let id = CouponId::generate();
        let parsed: CouponId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
