//! End-to-end order journey: cart, checkout, payment, delivery,
//! archive, with the notifier fan-out running alongside.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, PhoneNumber, ProductId, RequestContext, UserId};

use catalog::{InMemoryCatalog, InventoryLedger, Product};
use orders::{
    spawn_notifier, DeliveryStatus, Notification, NotificationSink, OrderService, PaymentState,
    ShippingMethod, ShippingMethods, LOYALTY_POINTS_PER_ORDER,
};

struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<Notification>,
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tx.send(notification.clone())?;
        Ok(())
    }
}

fn build_service() -> Arc<OrderService> {
    let catalog = Arc::new(InMemoryCatalog::new());
    let ledger = Arc::new(InventoryLedger::new());
    let shipping = Arc::new(ShippingMethods::new());
    shipping.upsert(ShippingMethod::new(1, "Boda", Money::from_shillings(200)));

    catalog.upsert(
        Product::new(ProductId::new(10), "Kettle", Money::from_shillings(1_500))
            .with_pick_and_pay(),
    );
    ledger.provision(ProductId::new(10), 20, 5);
    catalog.upsert(
        Product::new(ProductId::new(11), "Thermos", Money::from_shillings(5_000)).with_moq(
            100,
            5,
            Some(Money::from_shillings(6_000)),
        ),
    );

    Arc::new(OrderService::new(catalog, ledger, shipping))
}

#[tokio::test]
async fn paid_order_travels_to_the_archive() {
    let service = build_service();
    let ctx = RequestContext::customer(UserId::new());
    let admin = RequestContext::admin(UserId::new());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _notifier = spawn_notifier(
        service.events(),
        service.clone(),
        Arc::new(ChannelSink { tx }),
    );

    // stage and check out a mixed cart
    let cart = service.fetch_or_create_cart(&ctx);
    service
        .add_cart_item(&ctx, cart.id, ProductId::new(10), BTreeMap::new(), 2, Some(1))
        .unwrap();
    service
        .add_cart_item(&ctx, cart.id, ProductId::new(11), BTreeMap::new(), 3, Some(1))
        .unwrap();
    let order = service.create_order_from_cart(&ctx, cart.id).unwrap();
    // 2 x 1500 + 3 x 6000 + 200 shipping
    assert_eq!(order.total_price, Money::from_shillings(21_200));

    // pay by correlation id, the way the gateway callback does
    let payable = service.payable_order(&ctx, order.id).unwrap();
    let phone = PhoneNumber::parse("0712345678").unwrap();
    service
        .register_push(order.id, phone, payable.total_price, "ws_CO_e2e".to_string())
        .unwrap();
    service
        .resolve_payment_success("ws_CO_e2e", Some("SBX777".to_string()))
        .unwrap();

    let payment = service.payment_for_order(&ctx, order.id).unwrap();
    assert_eq!(payment.state, PaymentState::Completed);
    assert_eq!(payment.phone.as_str(), "254712345678");

    // deliver and archive
    service
        .update_delivery_status(&admin, order.id, DeliveryStatus::Delivered)
        .unwrap();
    let snapshot = service.archive_order(&admin, order.id).unwrap();
    assert_eq!(snapshot.total_price, order.total_price);
    assert_eq!(service.loyalty_points(&ctx), LOYALTY_POINTS_PER_ORDER);

    // the notifier saw the paid and archived events
    let first = rx.recv().await.unwrap();
    assert_eq!(first.event, "order_paid");
    assert_eq!(first.order_number, order.order_number());
    let second = rx.recv().await.unwrap();
    assert_eq!(second.event, "order_archived");
}

#[tokio::test]
async fn cancelling_notifies_and_restores_stock() {
    let service = build_service();
    let ctx = RequestContext::customer(UserId::new());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _notifier = spawn_notifier(
        service.events(),
        service.clone(),
        Arc::new(ChannelSink { tx }),
    );

    let cart = service.fetch_or_create_cart(&ctx);
    service
        .add_cart_item(&ctx, cart.id, ProductId::new(10), BTreeMap::new(), 4, None)
        .unwrap();
    let order = service.create_order_from_cart(&ctx, cart.id).unwrap();
    assert_eq!(service.ledger().quantity(ProductId::new(10)), Some(16));

    service.cancel_order(&ctx, order.id).unwrap();
    assert_eq!(service.ledger().quantity(ProductId::new(10)), Some(20));

    let note = rx.recv().await.unwrap();
    assert_eq!(note.event, "order_cancelled");
    assert_eq!(note.delivery_status, "cancelled");
}
