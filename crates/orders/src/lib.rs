//! Order lifecycle core: carts, checkout, cancellation, payments
//! ledger, archiving, and domain events.
//!
//! The flow through this crate mirrors the shop floor: a cart is staged
//! and priced speculatively, checkout freezes prices and moves stock
//! atomically, payment confirmation arrives by correlation id, and a
//! delivered, paid order is archived into an immutable snapshot that
//! credits loyalty points.

pub mod archive;
pub mod cart;
pub mod error;
pub mod events;
pub mod notify;
pub mod order;
pub mod payment;
pub mod service;
pub mod shipping;
pub mod status;

pub use archive::{CompletedOrder, LOYALTY_POINTS_PER_ORDER};
pub use cart::{Cart, CartItem, CartLineView, CartView};
pub use error::OrderError;
pub use events::{EventBus, OrderEvent};
pub use notify::{spawn_notifier, LoggingNotifier, Notification, NotificationSink};
pub use order::{Order, OrderItem};
pub use payment::{Payment, PaymentState};
pub use service::{BulkStatusUpdate, OrderService};
pub use shipping::{ShippingMethod, ShippingMethods};
pub use status::{DeliveryStatus, ParseStatusError, PaymentStatus};
