//! Error taxonomy
//!
//! Each component boundary gets its own `thiserror` enum; [`CouponError`]
//! rolls them all up with `#[from]` conversions so a binary can propagate a
//! single error type up to its top level while each crate keeps a narrow,
//! specific error surface for its own callers.

use thiserror::Error;

use crate::ids::EventId;

/// Errors surfaced by the KV-store / admission-script layer (`coupon-cache`).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("stock for event {0} has not been initialized")]
    StockNotInitialized(EventId),

    #[error("admission script unavailable on the backend, reload failed: {0}")]
    ScriptUnavailable(String),

    #[error("backend connection error: {0}")]
    Connection(String),

    #[error("backend returned a malformed admission response: {0}")]
    MalformedResponse(String),
}

/// Errors surfaced by the event publisher (`coupon-events`).
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("publish retries exhausted for event {event_id}")]
    RetriesExhausted { event_id: String },

    #[error("failed to serialize event envelope: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the issuance coordinator (`coupon-coordinator`).
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("request exceeded its deadline")]
    Timeout,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Errors surfaced by the relational consumer (`coupon-consumer`).
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("could not decode event envelope: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("failed to commit offsets after processing a batch")]
    CommitFailed,
}

/// Errors surfaced while loading configuration (`coupon-core::config`).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration from the environment: {0}")]
    Env(#[from] envy::Error),
}

/// Umbrella error type for binaries that need to return one error across
/// every component (the `coupon-service` bins).
#[derive(Debug, Error)]
pub enum CouponError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Consumer(#[from] ConsumerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type CouponResult<T> = Result<T, CouponError>;
