//! Shared application state accessible from all handlers.

use std::sync::Arc;

use cache::ResponseCache;
use catalog::{InMemoryCatalog, InventoryLedger};
use mpesa::PaymentProcessor;
use orders::{OrderService, ShippingMethods};

pub struct AppState {
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentProcessor>,
    pub cache: Arc<ResponseCache>,
    pub catalog: Arc<InMemoryCatalog>,
    pub ledger: Arc<InventoryLedger>,
    pub shipping: Arc<ShippingMethods>,
}

impl AppState {
    /// Serializes a value for a cached response, surfacing the failure
    /// instead of panicking.
    pub fn render<T: serde::Serialize>(
        value: &T,
    ) -> Result<serde_json::Value, crate::error::ApiError> {
        serde_json::to_value(value)
            .map_err(|e| crate::error::ApiError::Internal(format!("response encoding: {e}")))
    }
}
