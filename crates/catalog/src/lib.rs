//! Product catalog, MOQ pricing resolution, and the inventory ledger.
//!
//! The catalog is read-mostly reference data for the order core; the
//! inventory ledger is the contended write path and serializes every
//! mutation per product.

pub mod inventory;
pub mod pricing;
pub mod product;
pub mod store;

pub use inventory::{InventoryError, InventoryLedger, StockLevel};
pub use pricing::resolve_unit_price;
pub use product::{MoqStatus, Product};
pub use store::{Catalog, InMemoryCatalog};
