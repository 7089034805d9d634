use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::{db_url, is_unique_violation, menu_items, new_pool, notifications, orders, reviews, riders, students, vendors};
use crate::{
    db_types::{
        Coordinates,
        MenuItem,
        NewMenuItem,
        NewOrder,
        NewReview,
        NewRider,
        NewVendor,
        NotificationRecord,
        Order,
        OrderItem,
        Payment,
        Review,
        Rider,
        Student,
        Vendor,
    },
    engine_api::order_objects::OrderQueryFilter,
    events::NotificationEvent,
    traits::{
        AssignmentMode,
        AvailabilityChange,
        ClaimOutcome,
        DeliveryDatabase,
        DeliveryDatabaseError,
        OrderManagement,
        ReleaseOutcome,
        StatusChange,
        StatusChangeOutcome,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(order_number, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_payment(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn fetch_vendor(&self, vendor_id: i64) -> Result<Option<Vendor>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vendors::fetch_vendor(vendor_id, &mut conn).await?)
    }

    async fn fetch_student(&self, student_id: i64) -> Result<Option<Student>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(students::fetch_student(student_id, &mut conn).await?)
    }

    async fn fetch_rider(&self, rider_id: i64) -> Result<Option<Rider>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(riders::fetch_rider(rider_id, &mut conn).await?)
    }

    async fn fetch_menu_item(&self, menu_item_id: i64) -> Result<Option<MenuItem>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(menu_items::fetch_menu_item(menu_item_id, &mut conn).await?)
    }

    async fn fetch_available_riders(&self) -> Result<Vec<Rider>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(riders::fetch_available_riders(&mut conn).await?)
    }
}

impl DeliveryDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, DeliveryDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let number = order.order_number.clone();
        let id = orders::insert_order(order, &mut tx).await.map_err(|e| {
            if is_unique_violation(&e) {
                DeliveryDatabaseError::AlreadyExists(format!("order {number}"))
            } else {
                DeliveryDatabaseError::from(e)
            }
        })?;
        let order = orders::fetch_order(id, &mut tx)
            .await?
            .ok_or_else(|| DeliveryDatabaseError::Inconsistent(format!("Order #{id} vanished after insert")))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn apply_status_change(
        &self,
        change: StatusChange,
    ) -> Result<Option<StatusChangeOutcome>, DeliveryDatabaseError> {
        let mut tx = self.pool.begin().await?;
        if !orders::update_status(&change, &mut tx).await? {
            debug!("🗃️ Order #{} is no longer {}. {} was not applied.", change.order_id, change.from, change.to);
            return Ok(None);
        }
        let order = orders::fetch_order(change.order_id, &mut tx).await?.ok_or_else(|| {
            DeliveryDatabaseError::Inconsistent(format!("Order #{} vanished during a status change", change.order_id))
        })?;
        let at = change.timestamp;
        if change.settle {
            vendors::credit_delivered_order(order.vendor_id, order.subtotal, order.vendor_earnings, at, &mut tx).await?;
            students::credit_delivered_order(order.student_id, order.total_amount, at, &mut tx).await?;
            if let Some(rider_id) = order.assigned_rider_id {
                riders::credit_delivery(rider_id, order.rider_earnings, at, &mut tx).await?;
            }
            debug!("🗃️ Order #{} settled", order.id);
        }
        let mut released_rider = None;
        if let Some(rider_id) = order.assigned_rider_id.filter(|_| change.release_rider) {
            if riders::release_rider(rider_id, at, &mut tx).await? {
                released_rider = riders::fetch_rider(rider_id, &mut tx).await?;
            }
        }
        tx.commit().await?;
        debug!("🗃️ Order #{} moved from {} to {}", order.id, change.from, change.to);
        Ok(Some(StatusChangeOutcome { order, released_rider }))
    }

    async fn claim_order(
        &self,
        order_id: i64,
        rider_id: i64,
        mode: AssignmentMode,
    ) -> Result<ClaimOutcome, DeliveryDatabaseError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        if riders::reserve_rider(rider_id, now, &mut tx).await? &&
            orders::assign_rider(order_id, rider_id, mode, now, &mut tx).await?
        {
            let order = orders::fetch_order(order_id, &mut tx).await?;
            let rider = riders::fetch_rider(rider_id, &mut tx).await?;
            let (Some(order), Some(rider)) = (order, rider) else {
                return Err(DeliveryDatabaseError::Inconsistent(format!(
                    "Order #{order_id} or rider #{rider_id} vanished during a claim"
                )));
            };
            tx.commit().await?;
            debug!("🗃️ Rider #{rider_id} now holds order #{order_id}");
            return Ok(ClaimOutcome::Claimed { order, rider });
        }
        tx.rollback().await?;
        let mut conn = self.pool.acquire().await?;
        diagnose_failed_claim(order_id, rider_id, mode, &mut conn).await
    }

    async fn release_assignment(&self, order_id: i64, rider_id: i64) -> Result<ReleaseOutcome, DeliveryDatabaseError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        if !orders::clear_assignment(order_id, rider_id, now, &mut tx).await? {
            tx.rollback().await?;
            return match self.fetch_order(order_id).await? {
                None => Ok(ReleaseOutcome::OrderNotFound),
                Some(_) => Ok(ReleaseOutcome::NotAssigned),
            };
        }
        riders::release_rider(rider_id, now, &mut tx).await?;
        let order = orders::fetch_order(order_id, &mut tx).await?;
        let rider = riders::fetch_rider(rider_id, &mut tx).await?;
        let (Some(order), Some(rider)) = (order, rider) else {
            return Err(DeliveryDatabaseError::Inconsistent(format!(
                "Order #{order_id} or rider #{rider_id} vanished during a release"
            )));
        };
        tx.commit().await?;
        debug!("🗃️ Rider #{rider_id} released from order #{order_id}");
        Ok(ReleaseOutcome::Released { order, rider })
    }

    async fn set_rider_availability(
        &self,
        rider_id: i64,
        available: bool,
    ) -> Result<AvailabilityChange, DeliveryDatabaseError> {
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        let changed = if available {
            riders::release_rider(rider_id, now, &mut conn).await?
        } else {
            riders::reserve_rider(rider_id, now, &mut conn).await?
        };
        let Some(rider) = riders::fetch_rider(rider_id, &mut conn).await? else {
            return Ok(AvailabilityChange::RiderNotFound);
        };
        if changed {
            return Ok(AvailabilityChange::Changed(rider));
        }
        if rider.is_available == available {
            return Ok(AvailabilityChange::Unchanged(rider));
        }
        Ok(AvailabilityChange::BlockedByActiveOrder)
    }

    async fn toggle_rider_availability(&self, rider_id: i64) -> Result<AvailabilityChange, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(rider) = riders::toggle_availability(rider_id, Utc::now(), &mut conn).await? {
            return Ok(AvailabilityChange::Changed(rider));
        }
        match riders::fetch_rider(rider_id, &mut conn).await? {
            None => Ok(AvailabilityChange::RiderNotFound),
            Some(_) => Ok(AvailabilityChange::BlockedByActiveOrder),
        }
    }

    async fn update_rider_location(
        &self,
        rider_id: i64,
        location: Coordinates,
    ) -> Result<Option<Rider>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(riders::update_location(rider_id, location, Utc::now(), &mut conn).await?)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, DeliveryDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let order_id = review.order_id;
        let review = reviews::insert_review(review, &mut tx).await.map_err(|e| {
            if is_unique_violation(&e) {
                DeliveryDatabaseError::AlreadyExists(format!("a review for order #{order_id}"))
            } else {
                DeliveryDatabaseError::from(e)
            }
        })?;
        vendors::refresh_rating(review.vendor_id, &mut tx).await?;
        if let Some(rider_id) = review.rider_id {
            riders::refresh_rating(rider_id, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Review #{} stored for order #{order_id}", review.id);
        Ok(review)
    }

    async fn close(&mut self) -> Result<(), DeliveryDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Works out why a claim did not go through. Order problems take precedence over rider problems.
async fn diagnose_failed_claim(
    order_id: i64,
    rider_id: i64,
    mode: AssignmentMode,
    conn: &mut SqliteConnection,
) -> Result<ClaimOutcome, DeliveryDatabaseError> {
    let Some(order) = orders::fetch_order(order_id, &mut *conn).await? else {
        return Ok(ClaimOutcome::OrderNotFound);
    };
    if let Some(holder) = order.assigned_rider_id {
        return Ok(ClaimOutcome::AlreadyAssigned(holder));
    }
    if order.status != mode.required_status() {
        return Ok(ClaimOutcome::NotReady(order.status));
    }
    match riders::fetch_rider(rider_id, conn).await? {
        None => Ok(ClaimOutcome::RiderNotFound),
        Some(_) => Ok(ClaimOutcome::RiderUnavailable),
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), DeliveryDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DeliveryDatabaseError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create_student(&self, full_name: &str, phone: Option<&str>) -> Result<Student, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(students::insert_student(full_name, phone, &mut conn).await?)
    }

    pub async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vendors::insert_vendor(vendor, &mut conn).await?)
    }

    pub async fn set_vendor_open(&self, vendor_id: i64, is_open: bool) -> Result<Option<Vendor>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vendors::set_open(vendor_id, is_open, &mut conn).await?)
    }

    pub async fn create_rider(&self, rider: NewRider) -> Result<Rider, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(riders::insert_rider(rider, &mut conn).await?)
    }

    pub async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(menu_items::insert_menu_item(item, &mut conn).await?)
    }

    pub async fn set_menu_item_available(
        &self,
        menu_item_id: i64,
        is_available: bool,
    ) -> Result<Option<MenuItem>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(menu_items::set_available(menu_item_id, is_available, &mut conn).await?)
    }

    pub async fn fetch_review_for_order(&self, order_id: i64) -> Result<Option<Review>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(reviews::fetch_review_for_order(order_id, &mut conn).await?)
    }

    pub async fn save_notification(
        &self,
        event: &NotificationEvent,
    ) -> Result<NotificationRecord, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::insert_notification(event, &mut conn).await?)
    }

    pub async fn fetch_notifications(
        &self,
        recipient_kind: &str,
        recipient_id: Option<i64>,
    ) -> Result<Vec<NotificationRecord>, DeliveryDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::fetch_notifications(recipient_kind, recipient_id, &mut conn).await?)
    }
}
