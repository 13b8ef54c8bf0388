//! Stock ledger for pick-and-pay products.
//!
//! Every mutation of a product's stock goes through that product's row
//! lock, so concurrent checkouts serialize per product. Multi-line
//! reductions take their row locks in product-id order and verify every
//! line before decrementing any, which makes a checkout all-or-nothing
//! and keeps lock acquisition deadlock-free.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use common::ProductId;
use thiserror::Error;

/// Stock mutation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// The product has no inventory row (it is not pick-and-pay).
    #[error("product {product_id} is not stock-tracked")]
    NotStocked { product_id: ProductId },

    /// Requested more pieces than are on hand.
    #[error("insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },
}

/// Point-in-time snapshot of one product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub quantity: u32,
    pub low_stock_threshold: u32,
    pub last_updated: DateTime<Utc>,
}

impl StockLevel {
    pub fn is_low(&self) -> bool {
        self.quantity < self.low_stock_threshold
    }
}

#[derive(Debug)]
struct StockRecord {
    quantity: u32,
    low_stock_threshold: u32,
    last_updated: DateTime<Utc>,
}

impl StockRecord {
    fn snapshot(&self) -> StockLevel {
        StockLevel {
            quantity: self.quantity,
            low_stock_threshold: self.low_stock_threshold,
            last_updated: self.last_updated,
        }
    }
}

/// Per-product stock ledger.
///
/// Rows are `Arc<Mutex<_>>` so the outer map lock is held only long
/// enough to clone row handles; the actual stock check and decrement
/// happen under the row locks.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    rows: RwLock<BTreeMap<ProductId, Arc<Mutex<StockRecord>>>>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the inventory row for a product.
    pub fn provision(&self, product_id: ProductId, quantity: u32, low_stock_threshold: u32) {
        let record = StockRecord {
            quantity,
            low_stock_threshold,
            last_updated: Utc::now(),
        };
        self.rows
            .write()
            .unwrap()
            .insert(product_id, Arc::new(Mutex::new(record)));
    }

    fn row(&self, product_id: ProductId) -> Result<Arc<Mutex<StockRecord>>, InventoryError> {
        self.rows
            .read()
            .unwrap()
            .get(&product_id)
            .cloned()
            .ok_or(InventoryError::NotStocked { product_id })
    }

    /// Atomically reduces one product's stock by `quantity`.
    pub fn reduce(&self, product_id: ProductId, quantity: u32) -> Result<(), InventoryError> {
        let row = self.row(product_id)?;
        let mut record = row.lock().unwrap();
        if record.quantity < quantity {
            metrics::counter!("inventory_insufficient_stock_total").increment(1);
            return Err(InventoryError::InsufficientStock {
                product_id,
                available: record.quantity,
                requested: quantity,
            });
        }
        record.quantity -= quantity;
        record.last_updated = Utc::now();
        metrics::counter!("inventory_reductions_total").increment(1);
        if record.quantity < record.low_stock_threshold {
            tracing::warn!(
                product_id = %product_id,
                quantity = record.quantity,
                threshold = record.low_stock_threshold,
                "product stock is low"
            );
        }
        Ok(())
    }

    /// Atomically reduces stock for every line, or none of them.
    ///
    /// Duplicate product lines are aggregated before locking. Row locks
    /// are taken in ascending product-id order and held across the
    /// verify and decrement phases, so no concurrent reduction can
    /// invalidate a line between its check and its write.
    pub fn reduce_all(&self, lines: &[(ProductId, u32)]) -> Result<(), InventoryError> {
        let mut wanted: BTreeMap<ProductId, u32> = BTreeMap::new();
        for &(product_id, quantity) in lines {
            *wanted.entry(product_id).or_insert(0) += quantity;
        }

        let mut rows = Vec::with_capacity(wanted.len());
        for &product_id in wanted.keys() {
            rows.push(self.row(product_id)?);
        }

        let mut guards = Vec::with_capacity(rows.len());
        for row in &rows {
            guards.push(row.lock().unwrap());
        }

        for (guard, (&product_id, &quantity)) in guards.iter().zip(wanted.iter()) {
            if guard.quantity < quantity {
                metrics::counter!("inventory_insufficient_stock_total").increment(1);
                return Err(InventoryError::InsufficientStock {
                    product_id,
                    available: guard.quantity,
                    requested: quantity,
                });
            }
        }

        let now = Utc::now();
        for (guard, (&product_id, &quantity)) in guards.iter_mut().zip(wanted.iter()) {
            guard.quantity -= quantity;
            guard.last_updated = now;
            metrics::counter!("inventory_reductions_total").increment(1);
            if guard.quantity < guard.low_stock_threshold {
                tracing::warn!(
                    product_id = %product_id,
                    quantity = guard.quantity,
                    threshold = guard.low_stock_threshold,
                    "product stock is low"
                );
            }
        }

        Ok(())
    }

    /// Returns `quantity` pieces to a product's stock.
    ///
    /// A missing row is logged and ignored: cancellations must not fail
    /// because a product stopped being stock-tracked after the sale.
    pub fn restock(&self, product_id: ProductId, quantity: u32) {
        let Ok(row) = self.row(product_id) else {
            tracing::warn!(product_id = %product_id, quantity, "restock for untracked product skipped");
            return;
        };
        let mut record = row.lock().unwrap();
        record.quantity += quantity;
        record.last_updated = Utc::now();
        metrics::counter!("inventory_restocks_total").increment(1);
    }

    /// Restocks every line; missing rows are skipped per [`Self::restock`].
    pub fn restock_all(&self, lines: &[(ProductId, u32)]) {
        for &(product_id, quantity) in lines {
            self.restock(product_id, quantity);
        }
    }

    /// Current stock snapshot, or `None` if the product is untracked.
    pub fn level(&self, product_id: ProductId) -> Option<StockLevel> {
        let row = self.row(product_id).ok()?;
        let record = row.lock().unwrap();
        Some(record.snapshot())
    }

    /// Available quantity, or `None` if the product is untracked.
    pub fn quantity(&self, product_id: ProductId) -> Option<u32> {
        self.level(product_id).map(|level| level.quantity)
    }

    /// True if the product's stock is at or below its threshold.
    pub fn is_low_stock(&self, product_id: ProductId) -> bool {
        self.level(product_id).is_some_and(|level| level.is_low())
    }
}
