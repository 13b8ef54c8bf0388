//! Admin order management endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::OrderId;
use orders::{DeliveryStatus, OrderError};
use serde::{Deserialize, Serialize};

use crate::context::Caller;
use crate::error::ApiError;
use crate::routes::orders::{CompletedOrderResponse, OrderResponse};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkStatusRequest {
    pub order_ids: Vec<u64>,
    pub status: String,
}

#[derive(Deserialize)]
pub struct SingleStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct BulkStatusResponse {
    pub updated: usize,
    pub affected: Vec<AffectedOrder>,
}

#[derive(Serialize)]
pub struct AffectedOrder {
    pub user_id: String,
    pub order_id: u64,
}

fn parse_status(raw: &str) -> Result<DeliveryStatus, ApiError> {
    raw.parse::<DeliveryStatus>()
        .map_err(|e| ApiError::Order(OrderError::from(e)))
}

// -- Handlers --

/// GET /admin/orders?status= — all orders, optionally filtered.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let orders = state.orders.admin_orders(&ctx, status)?;
    Ok(Json(orders.iter().map(Into::into).collect()))
}

/// POST /admin/orders/bulk-status — move a batch of orders at once.
#[tracing::instrument(skip(state, req))]
pub async fn bulk_status(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Json(req): Json<BulkStatusRequest>,
) -> Result<Json<BulkStatusResponse>, ApiError> {
    let status = parse_status(&req.status)?;
    let ids: Vec<OrderId> = req.order_ids.iter().copied().map(OrderId::new).collect();
    let result = state
        .orders
        .bulk_update_delivery_status(&ctx, &ids, status)?;

    for (user_id, order_id) in &result.affected {
        state.cache.invalidate_order_caches(*user_id, *order_id);
    }
    Ok(Json(BulkStatusResponse {
        updated: result.updated,
        affected: result
            .affected
            .into_iter()
            .map(|(user_id, order_id)| AffectedOrder {
                user_id: user_id.to_string(),
                order_id: order_id.as_u64(),
            })
            .collect(),
    }))
}

/// POST /admin/orders/{id}/status — move one order.
#[tracing::instrument(skip(state, req))]
pub async fn single_status(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<u64>,
    Json(req): Json<SingleStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status = parse_status(&req.status)?;
    let order = state
        .orders
        .update_delivery_status(&ctx, OrderId::new(id), status)?;
    state
        .cache
        .invalidate_order_caches(order.user_id, order.id);
    Ok(Json((&order).into()))
}

/// POST /admin/orders/{id}/archive — snapshot a delivered, paid order.
#[tracing::instrument(skip(state))]
pub async fn archive(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<u64>,
) -> Result<(StatusCode, Json<CompletedOrderResponse>), ApiError> {
    let snapshot = state.orders.archive_order(&ctx, OrderId::new(id))?;
    state
        .cache
        .invalidate_order_caches(snapshot.user_id, snapshot.order_id);
    Ok((StatusCode::CREATED, Json((&snapshot).into())))
}
