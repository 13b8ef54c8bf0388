//! Payment record for an order's STK-push attempt.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PhoneNumber};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// One payment attempt per order. Re-initiating a pending payment
/// overwrites this record; the `checkout_request_id` is the only join
/// key the gateway callback carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub order_id: OrderId,
    pub phone: PhoneNumber,
    pub method: String,
    pub amount: Money,
    pub state: PaymentState,
    pub checkout_request_id: Option<String>,
    pub receipt_number: Option<String>,
    pub error_message: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// A fresh pending record for a just-accepted STK push.
    pub fn pending(
        order_id: OrderId,
        phone: PhoneNumber,
        amount: Money,
        checkout_request_id: String,
    ) -> Self {
        Self {
            order_id,
            phone,
            method: "mpesa".to_string(),
            amount,
            state: PaymentState::Pending,
            checkout_request_id: Some(checkout_request_id),
            receipt_number: None,
            error_message: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == PaymentState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_record_carries_correlation_id() {
        let payment = Payment::pending(
            OrderId::new(1),
            PhoneNumber::parse("254712345678").unwrap(),
            Money::from_shillings(1_000),
            "ws_CO_123".to_string(),
        );
        assert!(payment.is_pending());
        assert_eq!(payment.checkout_request_id.as_deref(), Some("ws_CO_123"));
        assert_eq!(payment.method, "mpesa");
        assert!(payment.receipt_number.is_none());
    }
}
