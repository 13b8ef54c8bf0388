//! Unit price resolution for cart lines and order freezing.

use common::Money;

use crate::product::{MoqStatus, Product};

/// Resolves the unit price a buyer pays for `quantity` pieces of `product`.
///
/// The full price applies to pick-and-pay products, to products whose
/// group buy is not currently active, and to buyers who meet the
/// per-person MOQ. Only an active group buy with a configured below-MOQ
/// price charges the penalty price, and only for quantities under the
/// per-person target.
pub fn resolve_unit_price(product: &Product, quantity: u32) -> Money {
    if product.is_pick_and_pay {
        return product.price;
    }
    if product.moq_status != MoqStatus::Active {
        return product.price;
    }
    if quantity >= product.moq_per_person {
        return product.price;
    }
    product.below_moq_price.unwrap_or(product.price)
}
