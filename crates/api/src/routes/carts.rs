//! Cart staging endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use common::{CartId, ProductId};
use orders::{CartView, ShippingMethod};
use serde::{Deserialize, Serialize};

use crate::context::Caller;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: u64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub quantity: u32,
    pub shipping_method_id: Option<u64>,
}

#[derive(Deserialize)]
pub struct SetShippingRequest {
    pub shipping_method_id: Option<u64>,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct ShippingMethodResponse {
    pub id: u64,
    pub name: String,
    pub price_cents: i64,
}

impl From<&ShippingMethod> for ShippingMethodResponse {
    fn from(method: &ShippingMethod) -> Self {
        Self {
            id: method.id,
            name: method.name.clone(),
            price_cents: method.price.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub item_id: u64,
    pub product_id: u64,
    pub product_name: String,
    pub attributes: BTreeMap<String, String>,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub is_pick_and_pay: bool,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub cart_id: u64,
    pub shipping_method: Option<ShippingMethodResponse>,
    pub lines: Vec<CartLineResponse>,
    pub subtotal_cents: i64,
    pub shipping_cost_cents: i64,
    pub total_cents: i64,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            cart_id: view.cart_id.as_u64(),
            shipping_method: view.shipping_method.as_ref().map(Into::into),
            lines: view
                .lines
                .into_iter()
                .map(|l| CartLineResponse {
                    item_id: l.item_id,
                    product_id: l.product_id.as_u64(),
                    product_name: l.product_name,
                    attributes: l.attributes,
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price.cents(),
                    line_total_cents: l.line_total.cents(),
                    is_pick_and_pay: l.is_pick_and_pay,
                })
                .collect(),
            subtotal_cents: view.subtotal.cents(),
            shipping_cost_cents: view.shipping_cost.cents(),
            total_cents: view.total.cents(),
        }
    }
}

// -- Handlers --

/// POST /carts — fetch or create the caller's cart.
#[tracing::instrument(skip(state))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.orders.fetch_or_create_cart(&ctx);
    let view = state.orders.cart_view(&ctx, cart.id)?;
    Ok(Json(view.into()))
}

/// GET /carts — the caller's priced cart, briefly cached.
#[tracing::instrument(skip(state))]
pub async fn get_current(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = cache::keys::user_cart(ctx.user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }
    let cart = state.orders.fetch_or_create_cart(&ctx);
    let view = state.orders.cart_view(&ctx, cart.id)?;
    let value = AppState::render(&CartResponse::from(view))?;
    state.cache.set(key, value.clone(), cache::CART_TTL);
    Ok(Json(value))
}

/// POST /carts/{cart_id}/items — add a product line.
#[tracing::instrument(skip(state, req))]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(cart_id): Path<u64>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = CartId::new(cart_id);
    state.orders.add_cart_item(
        &ctx,
        cart_id,
        ProductId::new(req.product_id),
        req.attributes,
        req.quantity,
        req.shipping_method_id,
    )?;
    state.cache.delete(&cache::keys::user_cart(ctx.user_id));
    let view = state.orders.cart_view(&ctx, cart_id)?;
    Ok(Json(view.into()))
}

/// PATCH /carts/{cart_id}/shipping — set or clear the shipping method.
#[tracing::instrument(skip(state, req))]
pub async fn set_shipping(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(cart_id): Path<u64>,
    Json(req): Json<SetShippingRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = CartId::new(cart_id);
    state
        .orders
        .set_cart_shipping(&ctx, cart_id, req.shipping_method_id)?;
    state.cache.delete(&cache::keys::user_cart(ctx.user_id));
    let view = state.orders.cart_view(&ctx, cart_id)?;
    Ok(Json(view.into()))
}

/// POST /carts/{cart_id}/items/{item_id}/quantity — set a line quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_quantity(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path((cart_id, item_id)): Path<(u64, u64)>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = CartId::new(cart_id);
    state
        .orders
        .update_cart_item_quantity(&ctx, cart_id, item_id, req.quantity)?;
    state.cache.delete(&cache::keys::user_cart(ctx.user_id));
    let view = state.orders.cart_view(&ctx, cart_id)?;
    Ok(Json(view.into()))
}

/// DELETE /carts/{cart_id}/items/{item_id} — drop a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path((cart_id, item_id)): Path<(u64, u64)>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = CartId::new(cart_id);
    state.orders.remove_cart_item(&ctx, cart_id, item_id)?;
    state.cache.delete(&cache::keys::user_cart(ctx.user_id));
    let view = state.orders.cart_view(&ctx, cart_id)?;
    Ok(Json(view.into()))
}

/// GET /shipping-methods — active delivery options.
pub async fn shipping_methods(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ShippingMethodResponse>> {
    Json(
        state
            .orders
            .shipping_methods()
            .iter()
            .map(Into::into)
            .collect(),
    )
}
