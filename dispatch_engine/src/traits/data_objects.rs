use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, Rider};

/// A guarded status change. The backend applies it only if the order's status is still `from` and, when `assignee` is
/// set, that rider still holds the order.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order_id: i64,
    pub from: OrderStatusType,
    pub to: OrderStatusType,
    pub timestamp: DateTime<Utc>,
    /// Persisted as the cancellation reason for `cancelled` and `rejected`.
    pub reason: Option<String>,
    /// Make the assigned rider (if any) available again.
    pub release_rider: bool,
    /// Credit the vendor, the student and the rider with the order's amounts.
    pub settle: bool,
    /// Only apply the change while this rider is the order's assignee.
    pub assignee: Option<i64>,
}

impl StatusChange {
    pub fn new(order_id: i64, from: OrderStatusType, to: OrderStatusType) -> Self {
        Self {
            order_id,
            from,
            to,
            timestamp: Utc::now(),
            reason: None,
            release_rider: false,
            settle: false,
            assignee: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn releasing_rider(mut self) -> Self {
        self.release_rider = true;
        self
    }

    pub fn settling(mut self) -> Self {
        self.settle = true;
        self
    }

    pub fn for_assignee(mut self, rider_id: i64) -> Self {
        self.assignee = Some(rider_id);
        self
    }
}

#[derive(Debug, Clone)]
pub struct StatusChangeOutcome {
    pub order: Order,
    /// The rider that was made available again by this change, as it is after the release.
    pub released_rider: Option<Rider>,
}

/// How a rider is attached to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentMode {
    /// The order must be `ready`. Only the assignment changes.
    PreAssign,
    /// The order must be `pending`. It is assigned and moved to `confirmed` in the same write.
    ConfirmOnAssign,
}

impl AssignmentMode {
    pub fn required_status(&self) -> OrderStatusType {
        match self {
            AssignmentMode::PreAssign => OrderStatusType::Ready,
            AssignmentMode::ConfirmOnAssign => OrderStatusType::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// The claim succeeded. The rider is now unavailable in the store.
    Claimed { order: Order, rider: Rider },
    OrderNotFound,
    RiderNotFound,
    /// Somebody else already holds the order.
    AlreadyAssigned(i64),
    /// The order is not in the status the assignment mode requires.
    NotReady(OrderStatusType),
    /// The rider is not marked available (it may have just claimed something else).
    RiderUnavailable,
}

#[derive(Debug, Clone)]
pub enum ReleaseOutcome {
    /// The assignment was cleared and the rider made available again.
    Released { order: Order, rider: Rider },
    OrderNotFound,
    /// The rider is not the order's current assignee, or the order has already been picked up.
    NotAssigned,
}

#[derive(Debug, Clone)]
pub enum AvailabilityChange {
    Changed(Rider),
    /// The flag already had the requested value.
    Unchanged(Rider),
    /// The rider may not become available while it holds a non-terminal order.
    BlockedByActiveOrder,
    RiderNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearbyRider {
    pub rider_id: i64,
    pub distance_km: f64,
}
