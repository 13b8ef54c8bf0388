//! The order service: every cart, order, payment-record, and archive
//! mutation goes through here, under a single writer lock.
//!
//! The lock discipline is deliberately simple: order-level state lives
//! behind one `RwLock` and no method ever awaits or calls out to the
//! network while holding it. Stock lives in the inventory ledger, which
//! serializes per product; order creation reaches into the ledger while
//! holding the order lock so checkout, cancel, and bulk updates cannot
//! interleave on the same order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use common::{CartId, Money, OrderId, PhoneNumber, ProductId, RequestContext, UserId};
use serde::Serialize;

use catalog::{resolve_unit_price, Catalog, InventoryLedger};

use crate::archive::{CompletedOrder, LOYALTY_POINTS_PER_ORDER};
use crate::cart::{Cart, CartLineView, CartView};
use crate::error::OrderError;
use crate::events::{EventBus, OrderEvent};
use crate::notify::Notification;
use crate::order::{Order, OrderItem};
use crate::payment::{Payment, PaymentState};
use crate::shipping::{ShippingMethod, ShippingMethods};
use crate::status::{DeliveryStatus, PaymentStatus};

/// Empty orders created within this window are swept at checkout.
const EMPTY_ORDER_GC_SECONDS: i64 = 300;

/// Result of an admin bulk status update, including the (user, order)
/// pairs whose cached views must be invalidated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkStatusUpdate {
    pub updated: usize,
    pub affected: Vec<(UserId, OrderId)>,
}

#[derive(Debug, Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    carts: HashMap<CartId, Cart>,
    carts_by_user: HashMap<UserId, CartId>,
    payments: HashMap<OrderId, Payment>,
    payments_by_reference: HashMap<String, OrderId>,
    completed: HashMap<OrderId, CompletedOrder>,
    loyalty_points: HashMap<UserId, u64>,
}

/// Coordinates carts, orders, payments, and archives over in-memory
/// state, the product catalog, and the inventory ledger.
pub struct OrderService {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<InventoryLedger>,
    shipping: Arc<ShippingMethods>,
    state: RwLock<State>,
    next_order_id: AtomicU64,
    next_cart_id: AtomicU64,
    events: EventBus,
}

impl OrderService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        ledger: Arc<InventoryLedger>,
        shipping: Arc<ShippingMethods>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            shipping,
            state: RwLock::new(State::default()),
            next_order_id: AtomicU64::new(1),
            next_cart_id: AtomicU64::new(1),
            events: EventBus::new(),
        }
    }

    /// The bus this service publishes lifecycle events on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    // ----- carts -----------------------------------------------------

    /// Returns the caller's cart, creating one on first use.
    #[tracing::instrument(skip(self), fields(user_id = %ctx.user_id))]
    pub fn fetch_or_create_cart(&self, ctx: &RequestContext) -> Cart {
        let mut state = self.state.write().unwrap();
        if let Some(cart_id) = state.carts_by_user.get(&ctx.user_id)
            && let Some(cart) = state.carts.get(cart_id)
        {
            return cart.clone();
        }
        let cart_id = CartId::new(self.next_cart_id.fetch_add(1, Ordering::SeqCst));
        let cart = Cart::new(cart_id, ctx.user_id);
        state.carts.insert(cart_id, cart.clone());
        state.carts_by_user.insert(ctx.user_id, cart_id);
        tracing::debug!(cart_id = %cart_id, "cart created");
        cart
    }

    /// Fetches a cart the caller owns.
    pub fn cart(&self, ctx: &RequestContext, cart_id: CartId) -> Result<Cart, OrderError> {
        let state = self.state.read().unwrap();
        state
            .carts
            .get(&cart_id)
            .filter(|c| c.user_id == ctx.user_id)
            .cloned()
            .ok_or(OrderError::CartNotFound(cart_id))
    }

    /// Prices the caller's cart for display. Prices resolved here are
    /// speculative; checkout resolves them again.
    pub fn cart_view(&self, ctx: &RequestContext, cart_id: CartId) -> Result<CartView, OrderError> {
        let cart = self.cart(ctx, cart_id)?;
        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = self
                .catalog
                .product(item.product_id)
                .ok_or(OrderError::ProductNotFound(item.product_id))?;
            let unit_price = resolve_unit_price(&product, item.quantity);
            lines.push(CartLineView {
                item_id: item.id,
                product_id: item.product_id,
                product_name: product.name,
                attributes: item.attributes.clone(),
                quantity: item.quantity,
                unit_price,
                line_total: unit_price.multiply(item.quantity),
                is_pick_and_pay: product.is_pick_and_pay,
            });
        }
        let subtotal: Money = lines.iter().map(|l| l.line_total).sum();
        let shipping_cost = cart
            .shipping_method
            .as_ref()
            .map(|m| m.price)
            .unwrap_or(Money::zero());
        Ok(CartView {
            cart_id: cart.id,
            shipping_method: cart.shipping_method,
            lines,
            subtotal,
            shipping_cost,
            total: subtotal + shipping_cost,
        })
    }

    /// Adds a product line to the cart.
    ///
    /// Attribute selections are validated against the product's allowed
    /// values, and pick-and-pay quantities against current stock. Adding
    /// a pick-and-pay product without an accompanying shipping method id
    /// clears the cart's shipping method; consistency is re-checked at
    /// checkout either way.
    #[tracing::instrument(skip(self, attributes), fields(user_id = %ctx.user_id))]
    pub fn add_cart_item(
        &self,
        ctx: &RequestContext,
        cart_id: CartId,
        product_id: ProductId,
        attributes: BTreeMap<String, String>,
        quantity: u32,
        shipping_method_id: Option<u64>,
    ) -> Result<Cart, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        let product = self
            .catalog
            .product(product_id)
            .ok_or(OrderError::ProductNotFound(product_id))?;
        for (name, value) in &attributes {
            if !product.allows_attribute(name, value) {
                return Err(OrderError::InvalidAttribute {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }

        let shipping = match shipping_method_id {
            Some(id) => Some(
                self.shipping
                    .active(id)
                    .ok_or(OrderError::ShippingMethodNotFound(id))?,
            ),
            None => None,
        };

        let mut state = self.state.write().unwrap();
        let cart = state
            .carts
            .get_mut(&cart_id)
            .filter(|c| c.user_id == ctx.user_id)
            .ok_or(OrderError::CartNotFound(cart_id))?;

        if product.is_pick_and_pay {
            let already = cart
                .items
                .iter()
                .filter(|l| l.product_id == product_id)
                .map(|l| l.quantity)
                .sum::<u32>();
            self.check_stock(product_id, already + quantity)?;
        }

        cart.add_line(product_id, attributes, quantity);
        match shipping {
            Some(method) => cart.shipping_method = Some(method),
            None if product.is_pick_and_pay => cart.shipping_method = None,
            None => {}
        }
        Ok(cart.clone())
    }

    /// Sets a cart line to an absolute quantity.
    pub fn update_cart_item_quantity(
        &self,
        ctx: &RequestContext,
        cart_id: CartId,
        item_id: u64,
        quantity: u32,
    ) -> Result<Cart, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        let mut state = self.state.write().unwrap();
        let cart = state
            .carts
            .get_mut(&cart_id)
            .filter(|c| c.user_id == ctx.user_id)
            .ok_or(OrderError::CartNotFound(cart_id))?;
        let product_id = cart
            .line(item_id)
            .map(|l| l.product_id)
            .ok_or(OrderError::CartItemNotFound { item_id })?;
        let product = self
            .catalog
            .product(product_id)
            .ok_or(OrderError::ProductNotFound(product_id))?;
        if product.is_pick_and_pay {
            self.check_stock(product_id, quantity)?;
        }
        if let Some(line) = cart.line_mut(item_id) {
            line.quantity = quantity;
        }
        Ok(cart.clone())
    }

    /// Removes a cart line.
    pub fn remove_cart_item(
        &self,
        ctx: &RequestContext,
        cart_id: CartId,
        item_id: u64,
    ) -> Result<Cart, OrderError> {
        let mut state = self.state.write().unwrap();
        let cart = state
            .carts
            .get_mut(&cart_id)
            .filter(|c| c.user_id == ctx.user_id)
            .ok_or(OrderError::CartNotFound(cart_id))?;
        if !cart.remove_line(item_id) {
            return Err(OrderError::CartItemNotFound { item_id });
        }
        Ok(cart.clone())
    }

    /// Sets or clears the cart's shipping method.
    ///
    /// A cart holding only pick-and-pay products cannot carry one.
    pub fn set_cart_shipping(
        &self,
        ctx: &RequestContext,
        cart_id: CartId,
        shipping_method_id: Option<u64>,
    ) -> Result<Cart, OrderError> {
        let method = match shipping_method_id {
            Some(id) => Some(
                self.shipping
                    .active(id)
                    .ok_or(OrderError::ShippingMethodNotFound(id))?,
            ),
            None => None,
        };
        let mut state = self.state.write().unwrap();
        let cart = state
            .carts
            .get_mut(&cart_id)
            .filter(|c| c.user_id == ctx.user_id)
            .ok_or(OrderError::CartNotFound(cart_id))?;
        if method.is_some() && !cart.is_empty() && self.cart_is_pickup_only(cart)? {
            return Err(OrderError::ShippingMethodNotAllowed);
        }
        cart.shipping_method = method;
        Ok(cart.clone())
    }

    /// Active shipping methods for display.
    pub fn shipping_methods(&self) -> Vec<ShippingMethod> {
        self.shipping.list_active()
    }

    fn cart_is_pickup_only(&self, cart: &Cart) -> Result<bool, OrderError> {
        for line in &cart.items {
            let product = self
                .catalog
                .product(line.product_id)
                .ok_or(OrderError::ProductNotFound(line.product_id))?;
            if !product.is_pick_and_pay {
                return Ok(false);
            }
        }
        Ok(!cart.items.is_empty())
    }

    fn check_stock(&self, product_id: ProductId, requested: u32) -> Result<(), OrderError> {
        let available = self
            .ledger
            .quantity(product_id)
            .ok_or(catalog::InventoryError::NotStocked { product_id })?;
        if available < requested {
            return Err(catalog::InventoryError::InsufficientStock {
                product_id,
                available,
                requested,
            }
            .into());
        }
        Ok(())
    }

    // ----- checkout --------------------------------------------------

    /// Turns the caller's cart into an order, atomically.
    ///
    /// Rejects empty carts, enforces the shipping rules (pickup-only
    /// carts carry no method, mixed carts must have one), sweeps the
    /// caller's recent empty orders, verifies stock for every
    /// pick-and-pay line before decrementing any, freezes unit prices,
    /// persists the total, and clears the cart. Nothing is persisted on
    /// any failure.
    #[tracing::instrument(skip(self), fields(user_id = %ctx.user_id))]
    pub fn create_order_from_cart(
        &self,
        ctx: &RequestContext,
        cart_id: CartId,
    ) -> Result<Order, OrderError> {
        let order = {
            let mut state = self.state.write().unwrap();

            let cart = state
                .carts
                .get(&cart_id)
                .filter(|c| c.user_id == ctx.user_id)
                .ok_or(OrderError::CartNotFound(cart_id))?;
            if cart.is_empty() {
                return Err(OrderError::EmptyCart);
            }

            let mut items = Vec::with_capacity(cart.items.len());
            for line in &cart.items {
                let product = self
                    .catalog
                    .product(line.product_id)
                    .ok_or(OrderError::ProductNotFound(line.product_id))?;
                let unit_price = resolve_unit_price(&product, line.quantity);
                items.push(OrderItem {
                    product_id: line.product_id,
                    product_name: product.name,
                    attributes: line.attributes.clone(),
                    quantity: line.quantity,
                    unit_price,
                    is_pick_and_pay: product.is_pick_and_pay,
                });
            }

            let pickup_only = items.iter().all(|i| i.is_pick_and_pay);
            let shipping_method = cart.shipping_method.clone();
            if pickup_only {
                if shipping_method.is_some() {
                    return Err(OrderError::ShippingMethodNotAllowed);
                }
            } else if shipping_method.is_none() {
                return Err(OrderError::ShippingMethodRequired);
            }

            let user_id = ctx.user_id;
            let cutoff = Utc::now() - chrono::Duration::seconds(EMPTY_ORDER_GC_SECONDS);
            state
                .orders
                .retain(|_, o| !(o.user_id == user_id && o.items.is_empty() && o.created_at > cutoff));

            let stock_lines: Vec<(ProductId, u32)> = items
                .iter()
                .filter(|i| i.is_pick_and_pay)
                .map(|i| (i.product_id, i.quantity))
                .collect();
            self.ledger.reduce_all(&stock_lines)?;

            let id = OrderId::new(self.next_order_id.fetch_add(1, Ordering::SeqCst));
            let mut order = Order {
                id,
                user_id,
                shipping_method,
                delivery_location: None,
                payment_status: PaymentStatus::Pending,
                delivery_status: if pickup_only {
                    DeliveryStatus::ReadyForPickup
                } else {
                    DeliveryStatus::Processing
                },
                is_cancelled: false,
                total_price: Money::zero(),
                items,
                created_at: Utc::now(),
            };
            order.recompute_total();

            if let Some(cart) = state.carts.get_mut(&cart_id) {
                cart.clear();
            }
            state.orders.insert(id, order.clone());
            order
        };

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_total_shillings").record(order.total_price.shillings() as f64);
        tracing::info!(order_id = %order.id, total = %order.total_price, "order created");
        Ok(order)
    }

    // ----- order lifecycle -------------------------------------------

    /// Fetches one order, visible to its owner or an admin.
    pub fn order(&self, ctx: &RequestContext, order_id: OrderId) -> Result<Order, OrderError> {
        let state = self.state.read().unwrap();
        state
            .orders
            .get(&order_id)
            .filter(|o| o.user_id == ctx.user_id || ctx.is_admin)
            .cloned()
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// The caller's orders, newest first.
    pub fn user_orders(&self, ctx: &RequestContext) -> Vec<Order> {
        let state = self.state.read().unwrap();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == ctx.user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// All orders, optionally filtered by delivery status. Admin only.
    pub fn admin_orders(
        &self,
        ctx: &RequestContext,
        status: Option<DeliveryStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        if !ctx.is_admin {
            return Err(OrderError::Forbidden);
        }
        let state = self.state.read().unwrap();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.delivery_status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Cancels an order that has not left the warehouse.
    ///
    /// Restocks pick-and-pay lines and flips the cancelled flag and
    /// delivery status together; a concurrent double-cancel loses the
    /// race and gets `InvalidState`.
    #[tracing::instrument(skip(self), fields(user_id = %ctx.user_id))]
    pub fn cancel_order(&self, ctx: &RequestContext, order_id: OrderId) -> Result<Order, OrderError> {
        let (order, event) = {
            let mut state = self.state.write().unwrap();
            let order = state
                .orders
                .get_mut(&order_id)
                .filter(|o| o.user_id == ctx.user_id || ctx.is_admin)
                .ok_or(OrderError::OrderNotFound(order_id))?;
            if order.is_cancelled || !order.delivery_status.can_cancel() {
                return Err(OrderError::InvalidState {
                    order_id,
                    action: "be cancelled",
                });
            }
            self.ledger.restock_all(&order.pick_and_pay_lines());
            order.is_cancelled = true;
            order.delivery_status = DeliveryStatus::Cancelled;
            let event = OrderEvent::OrderCancelled {
                order_id,
                user_id: order.user_id,
            };
            (order.clone(), event)
        };

        metrics::counter!("orders_cancelled_total").increment(1);
        self.events.publish(event);
        Ok(order)
    }

    /// Attaches a shipping method and optional delivery location to an
    /// existing order, repricing the persisted total.
    pub fn update_order_shipping(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
        shipping_method_id: u64,
        delivery_location: Option<String>,
    ) -> Result<Order, OrderError> {
        let method = self
            .shipping
            .active(shipping_method_id)
            .ok_or(OrderError::ShippingMethodNotFound(shipping_method_id))?;
        let mut state = self.state.write().unwrap();
        let order = state
            .orders
            .get_mut(&order_id)
            .filter(|o| o.user_id == ctx.user_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        if order.is_cancelled {
            return Err(OrderError::InvalidState {
                order_id,
                action: "change shipping",
            });
        }
        if order.is_pick_and_pay_only() {
            return Err(OrderError::ShippingMethodNotAllowed);
        }
        order.shipping_method = Some(method);
        order.delivery_location = delivery_location;
        order.recompute_total();
        Ok(order.clone())
    }

    /// Sets one order's delivery status. Admin only.
    pub fn update_delivery_status(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
        status: DeliveryStatus,
    ) -> Result<Order, OrderError> {
        if !ctx.is_admin {
            return Err(OrderError::Forbidden);
        }
        let mut state = self.state.write().unwrap();
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        order.delivery_status = status;
        Ok(order.clone())
    }

    /// Moves every matching order to `status` in one atomic step.
    ///
    /// Ids that match no order are skipped; if none match at all the
    /// call fails with `NoneFound`. Returns the affected (user, order)
    /// pairs so callers can invalidate per-user cached views.
    #[tracing::instrument(skip(self, order_ids), fields(user_id = %ctx.user_id, count = order_ids.len()))]
    pub fn bulk_update_delivery_status(
        &self,
        ctx: &RequestContext,
        order_ids: &[OrderId],
        status: DeliveryStatus,
    ) -> Result<BulkStatusUpdate, OrderError> {
        if !ctx.is_admin {
            return Err(OrderError::Forbidden);
        }
        let mut state = self.state.write().unwrap();
        let found: Vec<OrderId> = order_ids
            .iter()
            .copied()
            .filter(|id| state.orders.contains_key(id))
            .collect();
        if found.is_empty() {
            return Err(OrderError::NoneFound);
        }

        let mut affected = Vec::with_capacity(found.len());
        for id in found {
            if let Some(order) = state.orders.get_mut(&id) {
                order.delivery_status = status;
                affected.push((order.user_id, id));
            }
        }
        metrics::counter!("orders_bulk_updated_total").increment(affected.len() as u64);
        Ok(BulkStatusUpdate {
            updated: affected.len(),
            affected,
        })
    }

    // ----- payments --------------------------------------------------

    /// The order a payment may be initiated against: must belong to the
    /// caller, not be cancelled, and still await payment.
    pub fn payable_order(&self, ctx: &RequestContext, order_id: OrderId) -> Result<Order, OrderError> {
        let order = self.order(ctx, order_id)?;
        if order.is_cancelled {
            return Err(OrderError::InvalidState {
                order_id,
                action: "be paid",
            });
        }
        if order.payment_status != PaymentStatus::Pending {
            return Err(OrderError::AlreadyProcessed(order_id));
        }
        Ok(order)
    }

    /// Records an accepted STK push against an order, replacing any
    /// earlier pending attempt and re-indexing the correlation id.
    pub fn register_push(
        &self,
        order_id: OrderId,
        phone: PhoneNumber,
        amount: Money,
        checkout_request_id: String,
    ) -> Result<(), OrderError> {
        let mut state = self.state.write().unwrap();
        if !state.orders.contains_key(&order_id) {
            return Err(OrderError::OrderNotFound(order_id));
        }
        let prior_reference = match state.payments.get(&order_id) {
            Some(existing) if existing.state == PaymentState::Completed => {
                return Err(OrderError::AlreadyProcessed(order_id));
            }
            Some(existing) => existing.checkout_request_id.clone(),
            None => None,
        };
        if let Some(old_reference) = prior_reference {
            state.payments_by_reference.remove(&old_reference);
        }
        state
            .payments_by_reference
            .insert(checkout_request_id.clone(), order_id);
        state.payments.insert(
            order_id,
            Payment::pending(order_id, phone, amount, checkout_request_id),
        );
        Ok(())
    }

    /// The payment record for an order the caller owns.
    pub fn payment_for_order(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<Payment, OrderError> {
        self.order(ctx, order_id)?;
        let state = self.state.read().unwrap();
        state
            .payments
            .get(&order_id)
            .cloned()
            .ok_or(OrderError::PaymentNotFound(order_id))
    }

    /// Marks the payment matching `checkout_request_id` as completed and
    /// the order as paid, in one step. A repeat confirmation for an
    /// already-completed payment is acknowledged without a second event.
    pub fn resolve_payment_success(
        &self,
        checkout_request_id: &str,
        receipt_number: Option<String>,
    ) -> Result<(UserId, OrderId), OrderError> {
        let (pair, event) = {
            let mut state = self.state.write().unwrap();
            let order_id = *state
                .payments_by_reference
                .get(checkout_request_id)
                .ok_or_else(|| OrderError::UnknownPaymentReference(checkout_request_id.to_string()))?;
            let payment = state
                .payments
                .get_mut(&order_id)
                .ok_or(OrderError::PaymentNotFound(order_id))?;
            if payment.state == PaymentState::Completed {
                let user_id = state
                    .orders
                    .get(&order_id)
                    .map(|o| o.user_id)
                    .ok_or(OrderError::OrderNotFound(order_id))?;
                return Ok((user_id, order_id));
            }
            payment.state = PaymentState::Completed;
            payment.receipt_number = receipt_number.clone();
            payment.error_message = None;
            payment.paid_at = Some(Utc::now());
            let amount = payment.amount;

            let order = state
                .orders
                .get_mut(&order_id)
                .ok_or(OrderError::OrderNotFound(order_id))?;
            order.payment_status = PaymentStatus::Paid;
            let event = OrderEvent::OrderPaid {
                order_id,
                user_id: order.user_id,
                amount,
                receipt_number,
            };
            ((order.user_id, order_id), event)
        };

        metrics::counter!("payments_completed_total").increment(1);
        self.events.publish(event);
        Ok(pair)
    }

    /// Marks the payment matching `checkout_request_id` as failed with
    /// the gateway's description. The order itself stays `Pending` so
    /// the customer can initiate another push. A failure arriving after
    /// a completed payment is ignored.
    pub fn resolve_payment_failure(
        &self,
        checkout_request_id: &str,
        description: &str,
    ) -> Result<(UserId, OrderId), OrderError> {
        let mut state = self.state.write().unwrap();
        let order_id = *state
            .payments_by_reference
            .get(checkout_request_id)
            .ok_or_else(|| OrderError::UnknownPaymentReference(checkout_request_id.to_string()))?;
        let payment = state
            .payments
            .get_mut(&order_id)
            .ok_or(OrderError::PaymentNotFound(order_id))?;
        if payment.state == PaymentState::Completed {
            tracing::warn!(order_id = %order_id, "failure report for a completed payment ignored");
        } else {
            payment.state = PaymentState::Failed;
            payment.error_message = Some(description.to_string());
            metrics::counter!("payments_failed_total").increment(1);
        }
        let order = state
            .orders
            .get(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        Ok((order.user_id, order_id))
    }

    // ----- archive and loyalty ---------------------------------------

    /// Freezes a delivered, paid order into the archive and credits the
    /// loyalty points exactly once. Admin only.
    #[tracing::instrument(skip(self), fields(user_id = %ctx.user_id))]
    pub fn archive_order(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<CompletedOrder, OrderError> {
        if !ctx.is_admin {
            return Err(OrderError::Forbidden);
        }
        let (snapshot, event) = {
            let mut state = self.state.write().unwrap();
            if state.completed.contains_key(&order_id) {
                return Err(OrderError::AlreadyArchived(order_id));
            }
            let order = state
                .orders
                .get(&order_id)
                .ok_or(OrderError::OrderNotFound(order_id))?;
            if order.delivery_status != DeliveryStatus::Delivered
                || order.payment_status != PaymentStatus::Paid
            {
                return Err(OrderError::InvalidState {
                    order_id,
                    action: "be archived",
                });
            }
            let snapshot = CompletedOrder::from_order(order);
            let user_id = order.user_id;
            state.completed.insert(order_id, snapshot.clone());
            *state.loyalty_points.entry(user_id).or_insert(0) += LOYALTY_POINTS_PER_ORDER;
            let event = OrderEvent::OrderArchived {
                order_id,
                user_id,
                points_credited: LOYALTY_POINTS_PER_ORDER,
            };
            (snapshot, event)
        };

        metrics::counter!("orders_archived_total").increment(1);
        self.events.publish(event);
        Ok(snapshot)
    }

    /// The caller's archived orders, newest completion first.
    pub fn completed_orders(&self, ctx: &RequestContext) -> Vec<CompletedOrder> {
        let state = self.state.read().unwrap();
        let mut orders: Vec<CompletedOrder> = state
            .completed
            .values()
            .filter(|c| c.user_id == ctx.user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        orders
    }

    /// The caller's loyalty point balance.
    pub fn loyalty_points(&self, ctx: &RequestContext) -> u64 {
        let state = self.state.read().unwrap();
        state.loyalty_points.get(&ctx.user_id).copied().unwrap_or(0)
    }

    // ----- notifications ---------------------------------------------

    /// Renders the notification context for an event, if its order is
    /// still around.
    pub fn notification_context(&self, event: &OrderEvent) -> Option<Notification> {
        let state = self.state.read().unwrap();
        let order = state.orders.get(&event.order_id())?;
        Some(Notification {
            event: event.name(),
            user_id: order.user_id,
            order_number: order.order_number(),
            total_price: order.total_price,
            item_count: order.items.len(),
            shipping_method: order.shipping_method.as_ref().map(|m| m.name.clone()),
            delivery_status: order.delivery_status.to_string(),
        })
    }
}
