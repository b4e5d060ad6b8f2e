//! Eventual-persistence pipeline: Kafka consumer → idempotent Postgres writer.

pub mod consumer;
pub mod outbox_sink;
pub mod relational;

pub use consumer::EventConsumer;
pub use outbox_sink::PostgresOutboxSink;
pub use relational::RelationalStore;
