//! Read access to product reference data.

use std::collections::HashMap;
use std::sync::RwLock;

use common::ProductId;

use crate::product::Product;

/// Lookup seam between the order core and wherever products live.
pub trait Catalog: Send + Sync {
    /// Fetches a product by id, or `None` if it does not exist.
    fn product(&self, id: ProductId) -> Option<Product>;
}

/// In-memory catalog backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub fn upsert(&self, product: Product) {
        self.products.write().unwrap().insert(product.id, product);
    }
}

impl Catalog for InMemoryCatalog {
    fn product(&self, id: ProductId) -> Option<Product> {
        self.products.read().unwrap().get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    #[test]
    fn returns_stored_product() {
        let catalog = InMemoryCatalog::new();
        let product = Product::new(ProductId::new(1), "Widget", Money::from_shillings(500));
        catalog.upsert(product.clone());

        assert_eq!(catalog.product(ProductId::new(1)), Some(product));
    }

    #[test]
    fn missing_product_is_none() {
        let catalog = InMemoryCatalog::new();
        assert_eq!(catalog.product(ProductId::new(42)), None);
    }

    #[test]
    fn upsert_replaces_existing() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert(Product::new(
            ProductId::new(1),
            "Widget",
            Money::from_shillings(500),
        ));
        catalog.upsert(Product::new(
            ProductId::new(1),
            "Widget v2",
            Money::from_shillings(600),
        ));

        let stored = catalog.product(ProductId::new(1)).unwrap();
        assert_eq!(stored.name, "Widget v2");
        assert_eq!(stored.price, Money::from_shillings(600));
    }
}
