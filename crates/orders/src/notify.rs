//! Best-effort customer notifications driven by domain events.

use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, UserId};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::events::{EventBus, OrderEvent};
use crate::service::OrderService;

/// Rendered notification context for one lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub event: &'static str,
    pub user_id: UserId,
    pub order_number: String,
    pub total_price: Money,
    pub item_count: usize,
    pub shipping_method: Option<String>,
    pub delivery_status: String,
}

/// Delivery channel for customer notifications (email, SMS, ...).
///
/// Failures are logged by the dispatcher and never reach the write path
/// that produced the event.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default sink: writes the notification to the log.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl NotificationSink for LoggingNotifier {
    async fn deliver(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            event = notification.event,
            user_id = %notification.user_id,
            order_number = %notification.order_number,
            total = %notification.total_price,
            items = notification.item_count,
            "customer notification"
        );
        Ok(())
    }
}

/// Subscribes to the event bus and fans events out to the sink.
///
/// The task ends when the bus is dropped. Lagged subscriptions skip to
/// the live edge; a missed notification is acceptable, a blocked order
/// write is not.
pub fn spawn_notifier(
    bus: &EventBus,
    service: Arc<OrderService>,
    sink: Arc<dyn NotificationSink>,
) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "notifier lagged behind the event bus");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            let Some(notification) = service.notification_context(&event) else {
                tracing::warn!(order_id = %event.order_id(), "no order found for event");
                continue;
            };

            if let Err(error) = sink.deliver(&notification).await {
                tracing::error!(
                    event = notification.event,
                    order_number = %notification.order_number,
                    %error,
                    "notification delivery failed"
                );
                metrics::counter!("notifications_failed_total").increment(1);
            } else {
                metrics::counter!("notifications_sent_total").increment(1);
            }
        }
    })
}
