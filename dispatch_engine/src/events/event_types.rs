use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// Who a notification is addressed to. Ids are the ids of the student, vendor or rider records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Recipient {
    Student(i64),
    Vendor(i64),
    Rider(i64),
    /// The administrative channel. Every admin sees these.
    Admins,
}

impl Recipient {
    pub fn kind(&self) -> &'static str {
        match self {
            Recipient::Student(_) => "student",
            Recipient::Vendor(_) => "vendor",
            Recipient::Rider(_) => "rider",
            Recipient::Admins => "admin",
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Recipient::Student(id) | Recipient::Vendor(id) | Recipient::Rider(id) => Some(*id),
            Recipient::Admins => None,
        }
    }
}

impl Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{} #{id}", self.kind()),
            None => write!(f, "admins"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Order,
    Delivery,
    Alert,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Order => "order",
            NotificationCategory::Delivery => "delivery",
            NotificationCategory::Alert => "alert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    /// Usually the order number the notification is about.
    pub reference_id: Option<String>,
}

impl Notification {
    pub fn new<T: Into<String>, M: Into<String>>(
        recipient: Recipient,
        title: T,
        body: M,
        category: NotificationCategory,
    ) -> Self {
        Self { recipient, title: title.into(), body: body.into(), category, reference_id: None }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference_id = Some(reference.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub notification: Notification,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(notification: Notification) -> Self {
        Self { notification, created_at: Utc::now() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        Self { order, old_status }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiderAssignedEvent {
    pub order: Order,
    pub rider_id: i64,
    /// True when the dispatcher picked the rider, false for claims and manual assignments.
    pub automatic: bool,
}

impl RiderAssignedEvent {
    pub fn new(order: Order, rider_id: i64, automatic: bool) -> Self {
        Self { order, rider_id, automatic }
    }
}
