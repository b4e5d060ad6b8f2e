//! Thin `axum` HTTP surface
//!
//! Routing, request validation, and JSON shaping only — every business
//! decision is delegated to `coupon-coordinator`/`coupon-cache` (§6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coupon_cache::{CacheLayer, KvStore};
use coupon_coordinator::IssuanceCoordinator;
use coupon_core::{CoordinatorError, EventId, IssuanceOutcome, UserId};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state handed to every handler.
pub struct AppState<K: KvStore> {
    pub coordinator: Arc<IssuanceCoordinator<K>>,
    pub cache: Arc<CacheLayer<K>>,
}

pub fn router<K: KvStore + 'static>(state: Arc<AppState<K>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/coupons/issue", post(issue::<K>))
        .route("/api/v1/coupons/status/{event_id}", get(status::<K>))
        .route(
            "/api/v1/coupons/user/{user_id}/event/{event_id}",
            get(user_coupon::<K>),
        )
        .route(
            "/api/v1/admin/events/{event_id}/stock",
            post(seed_stock::<K>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct IssueRequest {
    event_id: String,
    user_id: String,
}

#[derive(Debug, Serialize)]
struct IssueResponse {
    success: bool,
    #[serde(flatten)]
    outcome: IssuanceOutcome,
}

/// Every business outcome — issued, already-participated, exhausted,
/// uninitialized — is HTTP 200 with a `success` flag; only genuine
/// infrastructure failure produces a non-2xx status (§7: business results
/// are not errors).
async fn issue<K: KvStore>(
    State(state): State<Arc<AppState<K>>>,
    Json(request): Json<IssueRequest>,
) -> Response {
    let event_id = EventId::new(request.event_id);
    let user_id = UserId::new(request.user_id);

    match state.coordinator.issue(event_id, user_id).await {
        Ok(outcome) => {
            let success = outcome.is_success();
            (StatusCode::OK, Json(IssueResponse { success, outcome })).into_response()
        }
        Err(err) => coordinator_error_response(err),
    }
}

#[derive(Debug, Serialize)]
struct StockStatusResponse {
    event_id: String,
    remaining_stock: Option<u64>,
}

async fn status<K: KvStore>(
    State(state): State<Arc<AppState<K>>>,
    Path(event_id): Path<String>,
) -> Response {
    let event_id = EventId::new(event_id);
    match state.cache.get_stock(&event_id).await {
        Ok(remaining_stock) => Json(StockStatusResponse {
            event_id: event_id.to_string(),
            remaining_stock,
        })
        .into_response(),
        Err(err) => {
            error!(%err, "failed to read stock status");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct UserCouponResponse {
    user_id: String,
    event_id: String,
    coupon_id: Option<String>,
}

async fn user_coupon<K: KvStore>(
    State(state): State<Arc<AppState<K>>>,
    Path((user_id, event_id)): Path<(String, String)>,
) -> Response {
    let event_id = EventId::new(event_id);
    let user_id = UserId::new(user_id);
    match state.cache.get_user_coupon(&event_id, &user_id).await {
        Ok(coupon_id) => Json(UserCouponResponse {
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            coupon_id: coupon_id.map(|c| c.to_string()),
        })
        .into_response(),
        Err(err) => {
            error!(%err, "failed to read user coupon cache");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedStockRequest {
    stock: u64,
}

#[derive(Debug, Serialize)]
struct SeedStockResponse {
    initialized: bool,
}

async fn seed_stock<K: KvStore>(
    State(state): State<Arc<AppState<K>>>,
    Path(event_id): Path<String>,
    Json(request): Json<SeedStockRequest>,
) -> Response {
    let event_id = EventId::new(event_id);
    match state.coordinator.seed_stock(&event_id, request.stock).await {
        Ok(initialized) => Json(SeedStockResponse { initialized }).into_response(),
        Err(err) => coordinator_error_response(err),
    }
}

fn coordinator_error_response(err: CoordinatorError) -> Response {
    error!(%err, "coordinator error");
    let status = match err {
        CoordinatorError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        CoordinatorError::Cache(_) | CoordinatorError::Publish(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, err.to_string()).into_response()
}
