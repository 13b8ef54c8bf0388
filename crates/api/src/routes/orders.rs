//! Storefront order endpoints: checkout, queries, cancel, shipping.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId};
use orders::{CompletedOrder, Order, OrderItem};
use serde::{Deserialize, Serialize};

use crate::context::Caller;
use crate::error::ApiError;
use crate::routes::carts::ShippingMethodResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct UpdateOrderShippingRequest {
    pub shipping_method_id: u64,
    pub delivery_location: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: u64,
    pub product_name: String,
    pub attributes: BTreeMap<String, String>,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub is_pick_and_pay: bool,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.as_u64(),
            product_name: item.product_name.clone(),
            attributes: item.attributes.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            line_total_cents: item.line_total().cents(),
            is_pick_and_pay: item.is_pick_and_pay,
        }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: u64,
    pub order_number: String,
    pub payment_status: String,
    pub delivery_status: String,
    pub is_cancelled: bool,
    pub shipping_method: Option<ShippingMethodResponse>,
    pub delivery_location: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_u64(),
            order_number: order.order_number(),
            payment_status: order.payment_status.to_string(),
            delivery_status: order.delivery_status.to_string(),
            is_cancelled: order.is_cancelled,
            shipping_method: order.shipping_method.as_ref().map(Into::into),
            delivery_location: order.delivery_location.clone(),
            items: order.items.iter().map(Into::into).collect(),
            total_cents: order.total_price.cents(),
            created_at: order.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct CompletedOrderResponse {
    pub order_id: u64,
    pub order_number: String,
    pub shipping_method: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl From<&CompletedOrder> for CompletedOrderResponse {
    fn from(snapshot: &CompletedOrder) -> Self {
        Self {
            order_id: snapshot.order_id.as_u64(),
            order_number: snapshot.order_number.clone(),
            shipping_method: snapshot.shipping_method.clone(),
            items: snapshot.items.iter().map(Into::into).collect(),
            total_cents: snapshot.total_price.cents(),
            ordered_at: snapshot.ordered_at,
            completed_at: snapshot.completed_at,
        }
    }
}

// -- Handlers --

/// POST /orders/from-cart/{cart_id} — checkout.
#[tracing::instrument(skip(state))]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(cart_id): Path<u64>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state
        .orders
        .create_order_from_cart(&ctx, CartId::new(cart_id))?;
    state.cache.invalidate_order_caches(ctx.user_id, order.id);
    Ok((StatusCode::CREATED, Json((&order).into())))
}

/// GET /orders — the caller's orders, cached.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = cache::keys::user_orders(ctx.user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }
    let orders: Vec<OrderResponse> = state
        .orders
        .user_orders(&ctx)
        .iter()
        .map(Into::into)
        .collect();
    let value = AppState::render(&orders)?;
    state.cache.set(key, value.clone(), cache::ORDERS_TTL);
    Ok(Json(value))
}

/// GET /orders/{id} — one order, cached.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order_id = OrderId::new(id);
    let key = cache::keys::user_order(ctx.user_id, order_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }
    let order = state.orders.order(&ctx, order_id)?;
    let value = AppState::render(&OrderResponse::from(&order))?;
    state.cache.set(key, value.clone(), cache::ORDERS_TTL);
    Ok(Json(value))
}

/// POST /orders/{id}/cancel — cancel before shipment.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.cancel_order(&ctx, OrderId::new(id))?;
    state
        .cache
        .invalidate_order_caches(order.user_id, order.id);
    Ok(Json((&order).into()))
}

/// PUT /orders/{id}/shipping — attach shipping to an existing order.
#[tracing::instrument(skip(state, req))]
pub async fn update_shipping(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id): Path<u64>,
    Json(req): Json<UpdateOrderShippingRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.update_order_shipping(
        &ctx,
        OrderId::new(id),
        req.shipping_method_id,
        req.delivery_location,
    )?;
    state
        .cache
        .invalidate_order_caches(order.user_id, order.id);
    Ok(Json((&order).into()))
}

/// GET /completed-orders — the caller's archive, cached.
#[tracing::instrument(skip(state))]
pub async fn completed(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = cache::keys::completed_orders(ctx.user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }
    let snapshots: Vec<CompletedOrderResponse> = state
        .orders
        .completed_orders(&ctx)
        .iter()
        .map(Into::into)
        .collect();
    let value = AppState::render(&snapshots)?;
    state
        .cache
        .set(key, value.clone(), cache::COMPLETED_ORDERS_TTL);
    Ok(Json(value))
}
