//! Best-effort TTL cache for rendered API responses.
//!
//! This is a read accelerator, never a source of truth: every write
//! path invalidates the affected keys, expired entries are dropped on
//! read, and the system behaves identically with the cache empty.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use common::{OrderId, UserId};

/// Cached order lists stay this fresh.
pub const ORDERS_TTL: Duration = Duration::from_secs(5 * 60);
/// Completed orders change rarely and tolerate a longer window.
pub const COMPLETED_ORDERS_TTL: Duration = Duration::from_secs(15 * 60);
/// Carts are the most volatile view.
pub const CART_TTL: Duration = Duration::from_secs(2 * 60);

/// Cache key builders, one per cached view.
pub mod keys {
    use common::{OrderId, UserId};

    pub fn user_orders(user: UserId) -> String {
        format!("user_orders_{user}")
    }

    pub fn user_order(user: UserId, order: OrderId) -> String {
        format!("user_order_{user}_{order}")
    }

    pub fn completed_orders(user: UserId) -> String {
        format!("completed_orders_{user}")
    }

    pub fn completed_order(user: UserId, order: OrderId) -> String {
        format!("completed_order_{user}_{order}")
    }

    pub fn user_cart(user: UserId) -> String {
        format!("user_cart_{user}")
    }
}

struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// String-keyed TTL map of rendered JSON responses.
#[derive(Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches a live entry, dropping it if expired.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    metrics::counter!("cache_hits_total").increment(1);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    metrics::counter!("cache_misses_total").increment(1);
                    return None;
                }
            }
        }
        self.entries.write().unwrap().remove(key);
        metrics::counter!("cache_misses_total").increment(1);
        None
    }

    pub fn set(&self, key: impl Into<String>, value: serde_json::Value, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().unwrap().insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().unwrap().remove(key);
    }

    /// Drops every cached view a write to `(user, order)` could stale.
    pub fn invalidate_order_caches(&self, user: UserId, order: OrderId) {
        let mut entries = self.entries.write().unwrap();
        entries.remove(&keys::user_orders(user));
        entries.remove(&keys::user_order(user, order));
        entries.remove(&keys::completed_orders(user));
        entries.remove(&keys::completed_order(user, order));
        entries.remove(&keys::user_cart(user));
        tracing::debug!(user_id = %user, order_id = %order, "order caches invalidated");
    }
}
