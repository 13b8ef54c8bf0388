//! The order aggregate with prices frozen at creation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::shipping::ShippingMethod;
use crate::status::{DeliveryStatus, PaymentStatus};

/// One order line. `unit_price` is the authoritative price resolved at
/// checkout; later catalog price changes never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub attributes: BTreeMap<String, String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub is_pick_and_pay: bool,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order as persisted. Mutated only through the order service, which
/// serializes all order-level writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping_method: Option<ShippingMethod>,
    pub delivery_location: Option<String>,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub is_cancelled: bool,
    pub total_price: Money,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Human-facing order number derived from the id.
    pub fn order_number(&self) -> String {
        self.id.order_number()
    }

    pub fn is_pick_and_pay_only(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.is_pick_and_pay)
    }

    /// Lines that move stock, as (product, quantity) pairs.
    pub fn pick_and_pay_lines(&self) -> Vec<(ProductId, u32)> {
        self.items
            .iter()
            .filter(|i| i.is_pick_and_pay)
            .map(|i| (i.product_id, i.quantity))
            .collect()
    }

    /// Recomputes the persisted total from items plus shipping.
    pub fn recompute_total(&mut self) {
        let subtotal: Money = self.items.iter().map(OrderItem::line_total).sum();
        let shipping = self
            .shipping_method
            .as_ref()
            .map(|m| m.price)
            .unwrap_or(Money::zero());
        self.total_price = subtotal + shipping;
    }
}
