use thiserror::Error;

use crate::{
    db_types::{Coordinates, NewOrder, NewReview, Order, Review, Rider},
    traits::{
        data_objects::{
            AssignmentMode,
            AvailabilityChange,
            ClaimOutcome,
            ReleaseOutcome,
            StatusChange,
            StatusChangeOutcome,
        },
        OrderManagement,
    },
};

/// This trait defines the write flows of the dispatch engine.
///
/// Each method is a single atomic unit of work. Implementations must make every state-dependent write conditional on
/// the state it expects (`... WHERE status = ?`, `... WHERE assigned_rider_id IS NULL`, and so on), so that concurrent
/// callers can never both succeed from the same prior state.
#[allow(async_fn_in_trait)]
pub trait DeliveryDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order with its line items and a pending payment record, in a single transaction.
    ///
    /// Returns the stored order, in `pending` status.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, DeliveryDatabaseError>;

    /// Applies a status change if, and only if, the order's status is still `change.from`.
    ///
    /// In the same transaction:
    /// * the timestamp column for the target status is stamped (`cancelled_at` for cancellations and rejections),
    /// * the reason is persisted for cancellations and rejections,
    /// * if `release_rider` is set, the assigned rider is marked available,
    /// * if `settle` is set, vendor, student and rider counters are credited.
    ///
    /// Returns `None` if the order does not exist or its status has moved on.
    async fn apply_status_change(
        &self,
        change: StatusChange,
    ) -> Result<Option<StatusChangeOutcome>, DeliveryDatabaseError>;

    /// Attaches the rider to the order. The order must be unassigned and in the status `mode` requires, and the rider
    /// must be available. The rider is marked unavailable in the same transaction. Exactly one of any number of
    /// concurrent claims on the same order can succeed.
    async fn claim_order(
        &self,
        order_id: i64,
        rider_id: i64,
        mode: AssignmentMode,
    ) -> Result<ClaimOutcome, DeliveryDatabaseError>;

    /// Detaches the rider from an order it has not yet picked up and makes the rider available again.
    async fn release_assignment(&self, order_id: i64, rider_id: i64) -> Result<ReleaseOutcome, DeliveryDatabaseError>;

    /// Sets the rider's availability flag. Becoming available is refused while the rider holds a non-terminal order.
    async fn set_rider_availability(
        &self,
        rider_id: i64,
        available: bool,
    ) -> Result<AvailabilityChange, DeliveryDatabaseError>;

    /// Flips the rider's availability flag, with the same rules as [`Self::set_rider_availability`].
    async fn toggle_rider_availability(&self, rider_id: i64) -> Result<AvailabilityChange, DeliveryDatabaseError>;

    /// Records the rider's position. Returns `None` if the rider does not exist.
    async fn update_rider_location(
        &self,
        rider_id: i64,
        location: Coordinates,
    ) -> Result<Option<Rider>, DeliveryDatabaseError>;

    /// Stores a review and recalculates the vendor's (and rider's) rating and review count.
    ///
    /// Fails with [`DeliveryDatabaseError::AlreadyExists`] if the order has already been reviewed.
    async fn insert_review(&self, review: NewReview) -> Result<Review, DeliveryDatabaseError>;

    /// Closes the database connection pool.
    async fn close(&mut self) -> Result<(), DeliveryDatabaseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum DeliveryDatabaseError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Cannot insert {0}, since it already exists")]
    AlreadyExists(String),
    #[error("The stored data is inconsistent. {0}")]
    Inconsistent(String),
}
