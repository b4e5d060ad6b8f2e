//! Business outcomes of an issuance attempt
//!
//! These are results, not errors: a user who already participated, or an
//! event that is out of stock, is the admission script working correctly,
//! not a failure of the service. Callers match on [`IssuanceOutcome`]
//! instead of a `CoordinatorError` variant; only genuine infrastructure
//! failure goes through `coupon_core::error`.

use serde::{Deserialize, Serialize};

use crate::ids::CouponId;

/// Result of a single call to `IssuanceCoordinator::issue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IssuanceOutcome {
    /// A new coupon was admitted and assigned `coupon_id`. `remaining_stock`
    /// is the value the admission script itself observed post-decrement.
    Issued {
        coupon_id: CouponId,
        remaining_stock: u64,
    },

    /// The requesting user already holds a coupon for this event; the
    /// existing `coupon_id` is returned so retries are idempotent from the
    /// caller's point of view.
    UserAlreadyParticipated {
        coupon_id: CouponId,
        remaining_stock: u64,
    },

    /// The event's stock counter reached zero before this request was
    /// admitted.
    NoStockAvailable { remaining_stock: u64 },

    /// The event's stock counter has not been seeded yet and the
    /// coordinator was not configured (or declined) to auto-seed it.
    StockNotInitialized,
}

impl IssuanceOutcome {
    /// The coupon id associated with this outcome, if any.
    pub fn coupon_id(&self) -> Option<CouponId> {
        match self {
            IssuanceOutcome::Issued { coupon_id, .. }
            | IssuanceOutcome::UserAlreadyParticipated { coupon_id, .. } => Some(*coupon_id),
            IssuanceOutcome::NoStockAvailable { .. } | IssuanceOutcome::StockNotInitialized => None,
        }
    }

    /// Whether this outcome represents a coupon the user can redeem,
    /// whether newly issued or recovered from a prior call.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            IssuanceOutcome::Issued { .. } | IssuanceOutcome::UserAlreadyParticipated { .. }
        )
    }
}
