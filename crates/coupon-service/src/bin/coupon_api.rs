//! HTTP API binary: routing, validation, and JSON shaping over
//! `coupon-coordinator`/`coupon-cache`. See `coupon_service::http` for the
//! router and handlers.

use std::sync::Arc;

use coupon_cache::{CacheLayer, RedisClusterStore, TtlPolicy};
use coupon_coordinator::IssuanceCoordinator;
use coupon_core::AppConfig;
use coupon_consumer::{PostgresOutboxSink, RelationalStore};
use coupon_events::{Compression, FallbackPublisher, RdKafkaPublisher};
use coupon_service::http::{router, AppState};
use coupon_service::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = AppConfig::from_env()?;

    let kv_store = RedisClusterStore::connect(&config.redis_nodes()).await?;
    let cache = Arc::new(CacheLayer::new(
        Arc::new(kv_store),
        TtlPolicy {
            stock: std::time::Duration::from_secs(config.default_stock_ttl_seconds),
            participants: std::time::Duration::from_secs(config.default_participant_ttl_seconds),
            user_coupon: std::time::Duration::from_secs(config.default_coupon_cache_ttl_seconds),
        },
    ));

    let relational = RelationalStore::connect(&config.database_url, 10).await?;
    relational.run_migrations().await?;
    let outbox_sink = PostgresOutboxSink::new(relational.pool().clone());

    let kafka_publisher = RdKafkaPublisher::new(&config.kafka_broker_list(), Compression::Snappy)?;
    let publisher = Arc::new(FallbackPublisher::new(kafka_publisher, outbox_sink));

    let coordinator = Arc::new(IssuanceCoordinator::new(
        cache.clone(),
        publisher,
        config.request_deadline(),
        config.default_initial_stock,
    ));

    let state = Arc::new(AppState { coordinator, cache });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("coupon-api listening on 0.0.0.0:8080");
    axum::serve(listener, app).await?;

    Ok(())
}
