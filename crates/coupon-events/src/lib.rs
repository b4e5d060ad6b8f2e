//! Durable event envelope and publisher for the coupon issuance service.
//!
//! [`event::IssuanceEvent`] is the tagged envelope published to and consumed
//! from the log. [`publisher::EventPublisher`] is the publish-side seam:
//! [`kafka::RdKafkaPublisher`] talks to a real broker, [`memory::ChannelPublisher`]
//! records in-memory for tests.

pub mod event;
pub mod kafka;
pub mod memory;
pub mod outbox;
pub mod publisher;

pub use event::{EnvelopeId, IssuanceEvent};
pub use kafka::{Compression, RdKafkaPublisher};
pub use memory::ChannelPublisher;
pub use outbox::{FallbackPublisher, PublishFailureSink};
pub use publisher::EventPublisher;
