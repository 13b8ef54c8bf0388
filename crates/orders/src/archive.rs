//! Immutable snapshots of finished orders.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderItem};

/// Loyalty points credited once per archived order.
pub const LOYALTY_POINTS_PER_ORDER: u64 = 10;

/// A delivered-and-paid order frozen for the customer's history.
///
/// Snapshots never change after creation; the live order may later be
/// purged without losing the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub shipping_method: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_price: Money,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl CompletedOrder {
    /// Snapshots a live order at its moment of completion.
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number(),
            user_id: order.user_id,
            shipping_method: order.shipping_method.as_ref().map(|m| m.name.clone()),
            items: order.items.clone(),
            total_price: order.total_price,
            ordered_at: order.created_at,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipping::ShippingMethod;
    use crate::status::{DeliveryStatus, PaymentStatus};

    #[test]
    fn snapshot_copies_order_fields() {
        let order = Order {
            id: OrderId::new(7),
            user_id: UserId::new(),
            shipping_method: Some(ShippingMethod::new(1, "Boda", Money::from_shillings(200))),
            delivery_location: None,
            payment_status: PaymentStatus::Paid,
            delivery_status: DeliveryStatus::Delivered,
            is_cancelled: false,
            total_price: Money::from_shillings(1_200),
            items: Vec::new(),
            created_at: Utc::now(),
        };

        let snapshot = CompletedOrder::from_order(&order);
        assert_eq!(snapshot.order_number, "MI7");
        assert_eq!(snapshot.shipping_method.as_deref(), Some("Boda"));
        assert_eq!(snapshot.total_price, Money::from_shillings(1_200));
        assert_eq!(snapshot.ordered_at, order.created_at);
    }
}
