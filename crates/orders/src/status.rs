//! Order status enums and their wire forms.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payment side of an order's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fulfillment side of an order's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Processing,
    ReadyForPickup,
    Shipped,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::ReadyForPickup => "ready_for_pickup",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// An order can be cancelled only before it leaves the warehouse.
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Processing | Self::ReadyForPickup)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string did not name a known delivery status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown delivery status: {0}")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for DeliveryStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "ready_for_pickup" => Ok(Self::ReadyForPickup),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cancel_allowed_only_before_shipment() {
        assert!(DeliveryStatus::Processing.can_cancel());
        assert!(DeliveryStatus::ReadyForPickup.can_cancel());
        assert!(!DeliveryStatus::Shipped.can_cancel());
        assert!(!DeliveryStatus::Delivered.can_cancel());
        assert!(!DeliveryStatus::Cancelled.can_cancel());
    }

    #[test]
    fn delivery_status_round_trips_through_str() {
        for status in [
            DeliveryStatus::Processing,
            DeliveryStatus::ReadyForPickup,
            DeliveryStatus::Shipped,
            DeliveryStatus::Delivered,
            DeliveryStatus::Cancelled,
        ] {
            assert_eq!(DeliveryStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = DeliveryStatus::from_str("on_hold").unwrap_err();
        assert_eq!(err, ParseStatusError("on_hold".to_string()));
    }

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::ReadyForPickup).unwrap(),
            "\"ready_for_pickup\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Paid).unwrap(),
            "\"paid\""
        );
    }
}
