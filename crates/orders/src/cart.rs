//! Cart aggregate: a mutable staging area that becomes an order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{CartId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::shipping::ShippingMethod;

/// One product line in a cart. Attribute selections (e.g. color) are part
/// of the line identity: the same product with different selections is a
/// different line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: u64,
    pub product_id: ProductId,
    pub attributes: BTreeMap<String, String>,
    pub quantity: u32,
}

/// A user's cart. Prices are never stored here; they are resolved on
/// every read and frozen only at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub shipping_method: Option<ShippingMethod>,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    next_item_id: u64,
}

impl Cart {
    pub fn new(id: CartId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            shipping_method: None,
            items: Vec::new(),
            created_at: Utc::now(),
            next_item_id: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds a line, merging quantity into an existing line with the same
    /// product and attribute selections. Returns the line's item id.
    pub fn add_line(
        &mut self,
        product_id: ProductId,
        attributes: BTreeMap<String, String>,
        quantity: u32,
    ) -> u64 {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|l| l.product_id == product_id && l.attributes == attributes)
        {
            line.quantity += quantity;
            return line.id;
        }
        let id = self.next_item_id;
        self.next_item_id += 1;
        self.items.push(CartItem {
            id,
            product_id,
            attributes,
            quantity,
        });
        id
    }

    pub fn line(&self, item_id: u64) -> Option<&CartItem> {
        self.items.iter().find(|l| l.id == item_id)
    }

    pub fn line_mut(&mut self, item_id: u64) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|l| l.id == item_id)
    }

    /// Removes a line; returns true if it existed.
    pub fn remove_line(&mut self, item_id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|l| l.id != item_id);
        self.items.len() < before
    }

    /// Empties the cart after a successful checkout.
    pub fn clear(&mut self) {
        self.items.clear();
        self.shipping_method = None;
    }
}

/// A fully priced cart line, resolved at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineView {
    pub item_id: u64,
    pub product_id: ProductId,
    pub product_name: String,
    pub attributes: BTreeMap<String, String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    pub is_pick_and_pay: bool,
}

/// A fully priced cart, resolved at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub cart_id: CartId,
    pub shipping_method: Option<ShippingMethod>,
    pub lines: Vec<CartLineView>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn same_product_and_attributes_merge() {
        let mut cart = Cart::new(CartId::new(1), UserId::new());
        let first = cart.add_line(ProductId::new(1), attrs(&[("color", "red")]), 2);
        let second = cart.add_line(ProductId::new(1), attrs(&[("color", "red")]), 3);

        assert_eq!(first, second);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[test]
    fn different_attributes_stay_separate_lines() {
        let mut cart = Cart::new(CartId::new(1), UserId::new());
        cart.add_line(ProductId::new(1), attrs(&[("color", "red")]), 1);
        cart.add_line(ProductId::new(1), attrs(&[("color", "blue")]), 1);

        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn remove_line_by_id() {
        let mut cart = Cart::new(CartId::new(1), UserId::new());
        let id = cart.add_line(ProductId::new(1), BTreeMap::new(), 1);

        assert!(cart.remove_line(id));
        assert!(!cart.remove_line(id));
        assert!(cart.is_empty());
    }

    #[test]
    fn clear_drops_items_and_shipping() {
        let mut cart = Cart::new(CartId::new(1), UserId::new());
        cart.add_line(ProductId::new(1), BTreeMap::new(), 1);
        cart.shipping_method = Some(ShippingMethod::new(
            1,
            "Boda",
            Money::from_shillings(200),
        ));

        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.shipping_method.is_none());
    }
}
