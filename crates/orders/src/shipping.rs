//! Shipping methods offered at checkout.

use std::collections::BTreeMap;
use std::sync::RwLock;

use common::Money;
use serde::{Deserialize, Serialize};

/// A delivery option a buyer can attach to a cart or order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: u64,
    pub name: String,
    pub price: Money,
    pub is_active: bool,
}

impl ShippingMethod {
    pub fn new(id: u64, name: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            is_active: true,
        }
    }
}

/// In-memory registry of shipping methods.
#[derive(Debug, Default)]
pub struct ShippingMethods {
    methods: RwLock<BTreeMap<u64, ShippingMethod>>,
}

impl ShippingMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, method: ShippingMethod) {
        self.methods.write().unwrap().insert(method.id, method);
    }

    /// Fetches an active method by id.
    pub fn active(&self, id: u64) -> Option<ShippingMethod> {
        self.methods
            .read()
            .unwrap()
            .get(&id)
            .filter(|m| m.is_active)
            .cloned()
    }

    /// All active methods, in id order.
    pub fn list_active(&self) -> Vec<ShippingMethod> {
        self.methods
            .read()
            .unwrap()
            .values()
            .filter(|m| m.is_active)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_methods_are_hidden() {
        let registry = ShippingMethods::new();
        registry.upsert(ShippingMethod::new(1, "Boda", Money::from_shillings(200)));
        let mut courier = ShippingMethod::new(2, "Courier", Money::from_shillings(450));
        courier.is_active = false;
        registry.upsert(courier);

        assert!(registry.active(1).is_some());
        assert!(registry.active(2).is_none());
        assert_eq!(registry.list_active().len(), 1);
    }
}
