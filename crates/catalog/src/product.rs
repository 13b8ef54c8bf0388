//! Product reference data consumed by the order core.

use std::collections::HashMap;

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a product's group-buy (MOQ) campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MoqStatus {
    /// Group buy is open; below-MOQ pricing applies.
    Active,
    /// Group buy closed without reaching the target.
    Closed,
    /// Group buy reached its target.
    Completed,
    /// Product does not participate in group buys.
    #[default]
    NotApplicable,
}

/// A catalog product as seen by the order and cart paths.
///
/// For pick-and-pay products the MOQ fields are inert: availability is
/// stock-backed through the inventory ledger and the full price always
/// applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub below_moq_price: Option<Money>,
    /// Group-buy target quantity.
    pub moq: u32,
    /// Quantity a single person must reach for the full group-buy price.
    pub moq_per_person: u32,
    pub moq_status: MoqStatus,
    pub is_pick_and_pay: bool,
    /// Valid attribute values, keyed by attribute name (e.g. "color").
    pub attribute_values: HashMap<String, Vec<String>>,
}

impl Product {
    /// Creates a product with MOQ machinery disabled.
    pub fn new(id: ProductId, name: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            below_moq_price: None,
            moq: 1,
            moq_per_person: 1,
            moq_status: MoqStatus::NotApplicable,
            is_pick_and_pay: false,
            attribute_values: HashMap::new(),
        }
    }

    /// Enables active group-buy pricing on this product.
    pub fn with_moq(mut self, moq: u32, moq_per_person: u32, below_moq_price: Option<Money>) -> Self {
        self.moq = moq;
        self.moq_per_person = moq_per_person;
        self.below_moq_price = below_moq_price;
        self.moq_status = MoqStatus::Active;
        self
    }

    /// Marks this product as pick-and-pay (stock-backed fulfillment).
    pub fn with_pick_and_pay(mut self) -> Self {
        self.is_pick_and_pay = true;
        self
    }

    /// Sets the valid attribute-value set for one attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<&str>) -> Self {
        self.attribute_values
            .insert(name.into(), values.into_iter().map(String::from).collect());
        self
    }

    /// Returns true if `value` is a valid selection for attribute `name`.
    pub fn allows_attribute(&self, name: &str, value: &str) -> bool {
        self.attribute_values
            .get(name)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Product {
        Product::new(ProductId::new(1), "Widget", Money::from_shillings(500))
            .with_attribute("color", vec!["red", "blue"])
    }

    #[test]
    fn defaults_disable_moq() {
        let p = Product::new(ProductId::new(1), "Widget", Money::from_shillings(500));
        assert_eq!(p.moq_status, MoqStatus::NotApplicable);
        assert!(!p.is_pick_and_pay);
        assert!(p.below_moq_price.is_none());
    }

    #[test]
    fn allows_known_attribute_value() {
        let p = widget();
        assert!(p.allows_attribute("color", "red"));
    }

    #[test]
    fn rejects_unknown_attribute_or_value() {
        let p = widget();
        assert!(!p.allows_attribute("color", "green"));
        assert!(!p.allows_attribute("size", "XL"));
    }

    #[test]
    fn moq_status_serializes_snake_case() {
        let json = serde_json::to_string(&MoqStatus::NotApplicable).unwrap();
        assert_eq!(json, "\"not_applicable\"");
    }
}
