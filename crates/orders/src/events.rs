//! Post-commit domain events.
//!
//! Events are published after the state change has committed, over a
//! broadcast channel. Publication is fire-and-forget: subscribers that
//! lag or disappear never affect the write path.

use common::{Money, OrderId, UserId};
use tokio::sync::broadcast;

/// Channel capacity before slow subscribers start missing events.
const EVENT_BUS_CAPACITY: usize = 256;

/// Lifecycle facts other parts of the system react to.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    OrderPaid {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        receipt_number: Option<String>,
    },
    OrderCancelled {
        order_id: OrderId,
        user_id: UserId,
    },
    OrderArchived {
        order_id: OrderId,
        user_id: UserId,
        points_credited: u64,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::OrderPaid { order_id, .. }
            | Self::OrderCancelled { order_id, .. }
            | Self::OrderArchived { order_id, .. } => *order_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderPaid { .. } => "order_paid",
            Self::OrderCancelled { .. } => "order_cancelled",
            Self::OrderArchived { .. } => "order_archived",
        }
    }
}

/// Broadcast bus for [`OrderEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OrderEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    /// Publishes an event; a bus with no subscribers is not an error.
    pub fn publish(&self, event: OrderEvent) {
        metrics::counter!("order_events_published_total", "event" => event.name()).increment(1);
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let event = OrderEvent::OrderCancelled {
            order_id: OrderId::new(1),
            user_id: UserId::new(),
        };
        bus.publish(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(OrderEvent::OrderPaid {
            order_id: OrderId::new(1),
            user_id: UserId::new(),
            amount: Money::from_shillings(100),
            receipt_number: None,
        });
    }
}
