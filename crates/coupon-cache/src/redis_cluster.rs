//! Redis-Cluster-backed [`KvStore`]
//!
//! The admission script (`admission.lua`) is loaded once and invoked by SHA
//! (`EVALSHA`); a `NOSCRIPT` reply — the script fell out of the cluster's
//! script cache, e.g. after a failover — triggers one reload-and-retry
//! before giving up with [`CacheError::ScriptUnavailable`]. Every other
//! operation is decomposed into ordinary commands scoped to a single
//! `{event_id}` hash tag, matching the key grammar in `keys.rs`.

use std::time::Duration;

use async_trait::async_trait;
use coupon_core::{CacheError, CouponId, EventId, UserId};
use redis::cluster_async::ClusterConnection;
use redis::{AsyncCommands, RedisError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::keys::{participants_key, stock_key, user_coupon_key};
use crate::store::{AdmissionResult, KvStore};

const ADMISSION_SCRIPT: &str = include_str!("admission.lua");

fn connection_error(err: RedisError) -> CacheError {
    CacheError::Connection(err.to_string())
}

/// `KvStore` implementation backed by a live Redis Cluster connection.
pub struct RedisClusterStore {
    conn: ClusterConnection,
    admission_sha: RwLock<Option<String>>,
}

impl RedisClusterStore {
    /// Build a store from cluster seed node URLs (`redis://host:port`
    /// form). Connection is established eagerly so misconfiguration is
    /// reported at startup rather than on the first request.
    pub async fn connect(nodes: &[String]) -> Result<Self, CacheError> {
        let client = redis::cluster::ClusterClient::new(nodes.to_vec())
            .map_err(connection_error)?;
        let conn = client
            .get_async_connection()
            .await
            .map_err(connection_error)?;
        Ok(Self {
            conn,
            admission_sha: RwLock::new(None),
        })
    }

    async fn sha(&self) -> Result<String, CacheError> {
        if let Some(sha) = self.admission_sha.read().await.clone() {
            return Ok(sha);
        }
        self.load_script().await
    }

    async fn load_script(&self) -> Result<String, CacheError> {
        let mut conn = self.conn.clone();
        let sha: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(ADMISSION_SCRIPT)
            .query_async(&mut conn)
            .await
            .map_err(connection_error)?;
        *self.admission_sha.write().await = Some(sha.clone());
        debug!(%sha, "loaded admission script");
        Ok(sha)
    }
}

#[async_trait]
impl KvStore for RedisClusterStore {
    async fn admit(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        candidate_coupon_id: CouponId,
        ttl: Duration,
    ) -> Result<AdmissionResult, CacheError> {
        let stock_k = stock_key(event_id);
        let participants_k = participants_key(event_id);
        let candidate = candidate_coupon_id.to_string();
        let ttl_seconds = ttl.as_secs();

        let sha = self.sha().await?;
        let mut conn = self.conn.clone();

        let result: Result<(i64, String, i64), RedisError> = redis::cmd("EVALSHA")
            .arg(&sha)
            .arg(2)
            .arg(&stock_k)
            .arg(&participants_k)
            .arg(user_id.as_str())
            .arg(&candidate)
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await;

        let (code, returned_id, remaining) = match result {
            Ok(triple) => triple,
            Err(err) if err.to_string().contains("NOSCRIPT") => {
                warn!(%event_id, "admission script missing from cluster cache, reloading");
                let sha = self.load_script().await.map_err(|_| {
                    CacheError::ScriptUnavailable(
                        "failed to reload admission script after NOSCRIPT".to_string(),
                    )
                })?;
                redis::cmd("EVALSHA")
                    .arg(&sha)
                    .arg(2)
                    .arg(&stock_k)
                    .arg(&participants_k)
                    .arg(user_id.as_str())
                    .arg(&candidate)
                    .arg(ttl_seconds)
                    .query_async(&mut conn)
                    .await
                    .map_err(connection_error)?
            }
            Err(err) => return Err(connection_error(err)),
        };

        match code {
            1 => Ok(AdmissionResult::Issued {
                coupon_id: candidate_coupon_id,
                remaining_stock: remaining.max(0) as u64,
            }),
            2 => {
                let existing: CouponId = returned_id
                    .parse()
                    .map_err(|_| CacheError::MalformedResponse(returned_id))?;
                Ok(AdmissionResult::AlreadyParticipated {
                    coupon_id: existing,
                    remaining_stock: remaining.max(0) as u64,
                })
            }
            0 => Ok(AdmissionResult::NoStockAvailable { remaining_stock: 0 }),
            -1 => Ok(AdmissionResult::StockNotInitialized),
            other => Err(CacheError::MalformedResponse(format!(
                "unexpected admission script return code {other}"
            ))),
        }
    }

    async fn initialize_stock(
        &self,
        event_id: &EventId,
        stock: u64,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let key = stock_key(event_id);
        let mut conn = self.conn.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(stock)
            .arg("EX")
            .arg(ttl.as_secs())
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(connection_error)?;
        Ok(set.is_some())
    }

    async fn get_stock(&self, event_id: &EventId) -> Result<Option<u64>, CacheError> {
        let key = stock_key(event_id);
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(&key).await.map_err(connection_error)?;
        Ok(value.map(|v| v.max(0) as u64))
    }

    async fn is_user_participated(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<bool, CacheError> {
        let key = participants_key(event_id);
        let mut conn = self.conn.clone();
        conn.sismember(&key, user_id.as_str())
            .await
            .map_err(connection_error)
    }

    async fn get_user_coupon(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Option<CouponId>, CacheError> {
        let key = user_coupon_key(user_id, event_id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(&key).await.map_err(connection_error)?;
        raw.map(|s| s.parse().map_err(|_| CacheError::MalformedResponse(s)))
            .transpose()
    }

    async fn cache_user_coupon(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        coupon_id: CouponId,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = user_coupon_key(user_id, event_id);
        let mut conn = self.conn.clone();
        conn.set_ex(&key, coupon_id.to_string(), ttl.as_secs())
            .await
            .map_err(connection_error)
    }

    async fn invalidate_event_cache(&self, event_id: &EventId) -> Result<(), CacheError> {
        // All keys for this event share the `{event_id}` hash tag, so a
        // direct multi-delete stays within one cluster slot and never needs
        // a cluster-wide KEYS/SCAN pattern scan (Design Notes).
        let stock_k = stock_key(event_id);
        let participants_k = participants_key(event_id);
        let participant_coupons_k = format!("{stock_k}:participant_coupons");
        let mut conn = self.conn.clone();
        conn.del(&[stock_k, participants_k, participant_coupons_k])
            .await
            .map_err(connection_error)
    }

    async fn touch(&self, event_id: &EventId, ttl: Duration) -> Result<(), CacheError> {
        let stock_k = stock_key(event_id);
        let participants_k = participants_key(event_id);
        let mut conn = self.conn.clone();
        let _: () = conn.expire(&stock_k, ttl.as_secs() as i64).await.map_err(connection_error)?;
        let _: () = conn
            .expire(&participants_k, ttl.as_secs() as i64)
            .await
            .map_err(connection_error)?;
        Ok(())
    }
}
