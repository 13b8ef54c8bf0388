//! Error taxonomy for the order core.

use catalog::InventoryError;
use common::{CartId, OrderId, ProductId};
use thiserror::Error;

use crate::status::ParseStatusError;

/// Everything that can go wrong in a cart, order, or archive operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("cart {0} not found")]
    CartNotFound(CartId),

    #[error("cart item {item_id} not found")]
    CartItemNotFound { item_id: u64 },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("no payment record for order {0}")]
    PaymentNotFound(OrderId),

    #[error("no payment matches reference {0}")]
    UnknownPaymentReference(String),

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("invalid value {value:?} for attribute {name:?}")]
    InvalidAttribute { name: String, value: String },

    #[error("a shipping method is required for this cart")]
    ShippingMethodRequired,

    #[error("pickup-only carts cannot carry a shipping method")]
    ShippingMethodNotAllowed,

    #[error("shipping method {0} not found or inactive")]
    ShippingMethodNotFound(u64),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),

    #[error("order {order_id} cannot {action} in its current state")]
    InvalidState { order_id: OrderId, action: &'static str },

    #[error("payment for order {0} has already been processed")]
    AlreadyProcessed(OrderId),

    #[error("order {0} is already archived")]
    AlreadyArchived(OrderId),

    #[error("no matching orders found")]
    NoneFound,

    #[error("operation requires admin privileges")]
    Forbidden,
}
