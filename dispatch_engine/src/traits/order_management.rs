use crate::{
    db_types::{MenuItem, Order, OrderItem, Payment, Rider, Student, Vendor},
    engine_api::order_objects::OrderQueryFilter,
    traits::DeliveryDatabaseError,
};

/// Read access to orders and the records that surround them.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, DeliveryDatabaseError>;

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, DeliveryDatabaseError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, DeliveryDatabaseError>;

    async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, DeliveryDatabaseError>;

    /// Fetches orders matching the filter, newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, DeliveryDatabaseError>;

    async fn fetch_vendor(&self, vendor_id: i64) -> Result<Option<Vendor>, DeliveryDatabaseError>;

    async fn fetch_student(&self, student_id: i64) -> Result<Option<Student>, DeliveryDatabaseError>;

    async fn fetch_rider(&self, rider_id: i64) -> Result<Option<Rider>, DeliveryDatabaseError>;

    async fn fetch_menu_item(&self, menu_item_id: i64) -> Result<Option<MenuItem>, DeliveryDatabaseError>;

    /// All riders whose availability flag is set.
    async fn fetch_available_riders(&self) -> Result<Vec<Rider>, DeliveryDatabaseError>;
}
