//! Environment-sourced configuration
//!
//! One flat struct, loaded once at process start via [`AppConfig::from_env`]
//! and handed down as plain data — no lazily-initialized global config
//! object.

use serde::Deserialize;

use crate::error::ConfigError;

fn default_stock_ttl_seconds() -> u64 {
    3600
}

fn default_participant_ttl_seconds() -> u64 {
    3600
}

fn default_coupon_cache_ttl_seconds() -> u64 {
    3600
}

fn default_initial_stock() -> u64 {
    1000
}

fn default_request_deadline_ms() -> u64 {
    10_000
}

fn default_consumer_poll_batch_size() -> u32 {
    100
}

fn default_consumer_poll_timeout_ms() -> u64 {
    1000
}

/// Top-level service configuration, loaded from environment variables.
///
/// See `SPEC_FULL.md` §6 for the full variable list and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Comma-separated `host:port` list of Redis Cluster seed nodes.
    pub redis_cluster_nodes: String,

    /// Comma-separated `host:port` list of Kafka brokers.
    pub kafka_brokers: String,

    /// Postgres connection string for the relational consumer.
    pub database_url: String,

    #[serde(default = "default_stock_ttl_seconds")]
    pub default_stock_ttl_seconds: u64,

    #[serde(default = "default_participant_ttl_seconds")]
    pub default_participant_ttl_seconds: u64,

    #[serde(default = "default_coupon_cache_ttl_seconds")]
    pub default_coupon_cache_ttl_seconds: u64,

    /// Stock the coordinator auto-seeds with when an event has never been
    /// initialized (§4.C step 1 convenience path).
    #[serde(default = "default_initial_stock")]
    pub default_initial_stock: u64,

    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,

    #[serde(default = "default_consumer_poll_batch_size")]
    pub consumer_poll_batch_size: u32,

    #[serde(default = "default_consumer_poll_timeout_ms")]
    pub consumer_poll_timeout_ms: u64,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::from_env::<AppConfig>().map_err(ConfigError::from)
    }

    /// Redis seed node list, split on commas.
    pub fn redis_nodes(&self) -> Vec<String> {
        self.redis_cluster_nodes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Kafka broker list, split on commas.
    pub fn kafka_broker_list(&self) -> Vec<String> {
        self.kafka_brokers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn request_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_deadline_ms)
    }

    pub fn consumer_poll_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.consumer_poll_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_comma_separated_node_lists_and_trims_whitespace() {
        let cfg = AppConfig {
            redis_cluster_nodes: "10.0.0.1:6379, 10.0.0.2:6379,10.0.0.3:6379".to_string(),
            kafka_brokers: "broker-1:9092,broker-2:9092".to_string(),
            database_url: "postgres://localhost/coupons".to_string(),
            default_stock_ttl_seconds: default_stock_ttl_seconds(),
            default_participant_ttl_seconds: default_participant_ttl_seconds(),
            default_coupon_cache_ttl_seconds: default_coupon_cache_ttl_seconds(),
            default_initial_stock: default_initial_stock(),
            request_deadline_ms: default_request_deadline_ms(),
            consumer_poll_batch_size: default_consumer_poll_batch_size(),
            consumer_poll_timeout_ms: default_consumer_poll_timeout_ms(),
        };

        assert_eq!(
            cfg.redis_nodes(),
            vec!["10.0.0.1:6379", "10.0.0.2:6379", "10.0.0.3:6379"]
        );
        assert_eq!(cfg.kafka_broker_list(), vec!["broker-1:9092", "broker-2:9092"]);
    }
}
