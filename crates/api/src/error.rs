//! API error types with HTTP response mapping.
//!
//! Every error renders as `{ "error": { "kind": "...", "message": "..." } }`
//! so clients can branch on the machine-readable kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::InventoryError;
use mpesa::MpesaError;
use orders::OrderError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or unusable identity headers.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order core error.
    Order(OrderError),
    /// Payment gateway error.
    Mpesa(MpesaError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation", msg),
            ApiError::Order(err) => order_error_to_response(err),
            ApiError::Mpesa(err) => mpesa_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        let body = serde_json::json!({ "error": { "kind": kind, "message": message } });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match &err {
        OrderError::EmptyCart
        | OrderError::InvalidQuantity
        | OrderError::InvalidAttribute { .. }
        | OrderError::ShippingMethodRequired
        | OrderError::ShippingMethodNotAllowed
        | OrderError::InvalidStatus(_)
        | OrderError::Inventory(InventoryError::NotStocked { .. }) => {
            (StatusCode::BAD_REQUEST, "validation", message)
        }
        OrderError::Inventory(InventoryError::InsufficientStock { .. })
        | OrderError::InvalidState { .. }
        | OrderError::AlreadyProcessed(_)
        | OrderError::AlreadyArchived(_) => (StatusCode::CONFLICT, "conflict", message),
        OrderError::CartNotFound(_)
        | OrderError::CartItemNotFound { .. }
        | OrderError::OrderNotFound(_)
        | OrderError::ProductNotFound(_)
        | OrderError::PaymentNotFound(_)
        | OrderError::UnknownPaymentReference(_)
        | OrderError::ShippingMethodNotFound(_)
        | OrderError::NoneFound => (StatusCode::NOT_FOUND, "not_found", message),
        OrderError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", message),
    }
}

fn mpesa_error_to_response(err: MpesaError) -> (StatusCode, &'static str, String) {
    match err {
        MpesaError::GatewayUnavailable(_) => {
            tracing::error!(error = %err, "payment gateway unavailable");
            (StatusCode::BAD_GATEWAY, "gateway_unavailable", err.to_string())
        }
        MpesaError::PushRejected { .. } => {
            (StatusCode::BAD_GATEWAY, "push_rejected", err.to_string())
        }
        MpesaError::MalformedCallback(_) => {
            (StatusCode::BAD_REQUEST, "validation", err.to_string())
        }
        MpesaError::InvalidPhone(_) => (StatusCode::BAD_REQUEST, "validation", err.to_string()),
        MpesaError::Order(inner) => order_error_to_response(inner),
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<MpesaError> for ApiError {
    fn from(err: MpesaError) -> Self {
        ApiError::Mpesa(err)
    }
}
