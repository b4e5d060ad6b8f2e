//! Consumer worker binary: runs the poll-process-commit loop against the
//! relational store until interrupted.

use clap::Parser;
use coupon_consumer::{EventConsumer, RelationalStore};
use coupon_core::AppConfig;
use coupon_service::telemetry;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(about = "Coupon issuance relational consumer")]
struct Args {
    /// Kafka consumer group id.
    #[arg(long, default_value = "coupon-consumer")]
    group_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let relational = RelationalStore::connect(&config.database_url, 10).await?;
    relational.run_migrations().await?;

    let consumer = EventConsumer::new(&config.kafka_broker_list(), &args.group_id, relational)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    tracing::info!(group_id = %args.group_id, "coupon-worker starting poll loop");
    consumer
        .run(
            config.consumer_poll_batch_size,
            config.consumer_poll_timeout(),
            shutdown_rx,
        )
        .await?;

    Ok(())
}
