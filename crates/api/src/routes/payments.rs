//! STK push initiation, payment views, and the gateway webhook.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use common::OrderId;
use orders::Payment;
use serde::{Deserialize, Serialize};

use crate::context::Caller;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct InitiatePaymentRequest {
    pub order_id: u64,
    pub phone_number: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct PushReceiptResponse {
    pub order_id: u64,
    pub checkout_request_id: String,
    pub customer_message: Option<String>,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub order_id: u64,
    pub state: String,
    pub method: String,
    pub phone: String,
    pub amount_cents: i64,
    pub receipt_number: Option<String>,
    pub error_message: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        let state = match payment.state {
            orders::PaymentState::Pending => "pending",
            orders::PaymentState::Completed => "completed",
            orders::PaymentState::Failed => "failed",
        };
        Self {
            order_id: payment.order_id.as_u64(),
            state: state.to_string(),
            method: payment.method.clone(),
            phone: payment.phone.to_string(),
            amount_cents: payment.amount.cents(),
            receipt_number: payment.receipt_number.clone(),
            error_message: payment.error_message.clone(),
            paid_at: payment.paid_at,
        }
    }
}

// -- Handlers --

/// POST /payments — start an STK push for an order awaiting payment.
#[tracing::instrument(skip(state, req))]
pub async fn initiate(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Json(req): Json<InitiatePaymentRequest>,
) -> Result<(StatusCode, Json<PushReceiptResponse>), ApiError> {
    let order_id = OrderId::new(req.order_id);
    let receipt = state
        .payments
        .initiate(&ctx, order_id, &req.phone_number)
        .await?;
    state.cache.invalidate_order_caches(ctx.user_id, order_id);
    Ok((
        StatusCode::ACCEPTED,
        Json(PushReceiptResponse {
            order_id: receipt.order_id.as_u64(),
            checkout_request_id: receipt.checkout_request_id,
            customer_message: receipt.customer_message,
        }),
    ))
}

/// GET /payments/{order_id} — payment view, polling the gateway while
/// the push is still pending.
#[tracing::instrument(skip(state))]
pub async fn status(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(order_id): Path<u64>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let order_id = OrderId::new(order_id);
    let payment = state.payments.payment_status(&ctx, order_id).await?;
    state.cache.invalidate_order_caches(ctx.user_id, order_id);
    Ok(Json((&payment).into()))
}

/// POST /payments/callback — unauthenticated Daraja webhook.
///
/// Acks in the gateway's `{ResultCode, ResultDesc}` convention once the
/// payment is located; malformed payloads and unknown correlation ids
/// get error statuses so the gateway's retry policy can engage.
#[tracing::instrument(skip(state, body))]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ack = state.payments.ingest_callback(&body).await?;
    state
        .cache
        .invalidate_order_caches(ack.user_id, ack.order_id);
    Ok(Json(serde_json::json!({
        "ResultCode": 0,
        "ResultDesc": "Accepted",
    })))
}
