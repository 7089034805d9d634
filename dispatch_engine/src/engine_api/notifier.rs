use log::*;

use crate::{
    db_types::{Order, OrderStatusType},
    events::{
        publish_to_all,
        EventProducers,
        Notification,
        NotificationCategory,
        NotificationEvent,
        OrderStatusChangedEvent,
        Recipient,
        RiderAssignedEvent,
    },
};

/// Turns engine outcomes into events and notifications and hands them to the registered hooks.
///
/// Nothing here can fail. Publishing happens after the database work has committed, and a hook that is gone is logged
/// and skipped.
#[derive(Clone, Default)]
pub struct Notifier {
    producers: EventProducers,
}

impl Notifier {
    pub fn new(producers: EventProducers) -> Self {
        Self { producers }
    }

    async fn notify(&self, notification: Notification) {
        trace!("📬️ Notifying {}: {}", notification.recipient, notification.title);
        publish_to_all(&self.producers.notification_producer, NotificationEvent::new(notification)).await;
    }

    pub async fn order_created(&self, order: &Order) {
        let n = &order.order_number;
        self.notify(
            Notification::new(
                Recipient::Vendor(order.vendor_id),
                "New Order",
                format!("You have received a new order #{n}"),
                NotificationCategory::Order,
            )
            .with_reference(n),
        )
        .await;
        self.notify(
            Notification::new(
                Recipient::Student(order.student_id),
                "Order Placed",
                format!("Your order #{n} has been placed successfully"),
                NotificationCategory::Order,
            )
            .with_reference(n),
        )
        .await;
        self.notify(
            Notification::new(
                Recipient::Admins,
                "New Order Placed",
                format!("A new order #{n} has been placed"),
                NotificationCategory::Order,
            )
            .with_reference(n),
        )
        .await;
    }

    pub async fn status_changed(&self, order: &Order, old_status: OrderStatusType) {
        let n = &order.order_number;
        let s = order.status;
        self.notify(
            Notification::new(
                Recipient::Student(order.student_id),
                "Order Update",
                format!("Your order #{n} is now {s}"),
                NotificationCategory::Order,
            )
            .with_reference(n),
        )
        .await;
        self.notify(
            Notification::new(
                Recipient::Vendor(order.vendor_id),
                "Order Update",
                format!("Order #{n} status: {s}"),
                NotificationCategory::Order,
            )
            .with_reference(n),
        )
        .await;
        if let Some(rider_id) = order.assigned_rider_id {
            self.notify(
                Notification::new(
                    Recipient::Rider(rider_id),
                    "Delivery Update",
                    format!("Delivery #{n} status: {s}"),
                    NotificationCategory::Delivery,
                )
                .with_reference(n),
            )
            .await;
        }
        if s.is_terminal() {
            self.notify(
                Notification::new(
                    Recipient::Admins,
                    format!("Order {s}"),
                    format!("Order #{n} has been {s}"),
                    NotificationCategory::Order,
                )
                .with_reference(n),
            )
            .await;
        }
        let event = OrderStatusChangedEvent::new(order.clone(), old_status);
        publish_to_all(&self.producers.status_changed_producer, event).await;
    }

    pub async fn rider_assigned(&self, order: &Order, rider_id: i64, automatic: bool) {
        let n = &order.order_number;
        self.notify(
            Notification::new(
                Recipient::Rider(rider_id),
                "New Delivery",
                format!("You have been assigned to deliver order #{n}"),
                NotificationCategory::Delivery,
            )
            .with_reference(n),
        )
        .await;
        self.notify(
            Notification::new(
                Recipient::Student(order.student_id),
                "Rider Assigned",
                format!("A rider has been assigned to your order #{n}"),
                NotificationCategory::Delivery,
            )
            .with_reference(n),
        )
        .await;
        self.notify(
            Notification::new(
                Recipient::Vendor(order.vendor_id),
                "Rider Assigned",
                format!("Rider assigned to order #{n}"),
                NotificationCategory::Delivery,
            )
            .with_reference(n),
        )
        .await;
        let event = RiderAssignedEvent::new(order.clone(), rider_id, automatic);
        publish_to_all(&self.producers.rider_assigned_producer, event).await;
    }

    pub async fn manual_assignment_required(&self, order: &Order, reason: &str) {
        warn!("🛵️ Order #{} needs a rider assigned by hand. {reason}", order.id);
        self.notify(
            Notification::new(
                Recipient::Admins,
                "Manual Assignment Required",
                format!("Order #{} {reason}. Manual assignment required.", order.order_number),
                NotificationCategory::Alert,
            )
            .with_reference(&order.order_number),
        )
        .await;
    }
}
