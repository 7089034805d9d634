use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderStatusType, Payment},
    engine_api::order_objects::OrderQueryFilter,
    traits::{AssignmentMode, StatusChange},
};

/// Statuses in which an order still occupies its rider.
pub(crate) const ACTIVE_STATUSES: &str = "('pending', 'confirmed', 'preparing', 'ready', 'picked_up')";

/// Statuses from which a rider can still hand an order back.
const RELEASABLE_STATUSES: &str = "('pending', 'confirmed', 'preparing', 'ready')";

/// Inserts a new order with its line items and a pending payment. This is not atomic on its own: call it inside a
/// transaction and pass `&mut tx` as the connection.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id = sqlx::query(
        r#"
            INSERT INTO orders (
                order_number,
                student_id,
                vendor_id,
                status,
                subtotal,
                delivery_fee,
                service_fee,
                total_amount,
                commission_amount,
                vendor_earnings,
                rider_earnings,
                delivery_address,
                delivery_lat,
                delivery_lng,
                delivery_block,
                delivery_dorm,
                customer_phone,
                customer_id_number,
                special_instructions,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $20)
        "#,
    )
    .bind(&order.order_number)
    .bind(order.student_id)
    .bind(order.vendor_id)
    .bind(OrderStatusType::Pending)
    .bind(order.subtotal)
    .bind(order.delivery_fee)
    .bind(order.service_fee)
    .bind(order.total_amount)
    .bind(order.commission_amount)
    .bind(order.vendor_earnings)
    .bind(order.rider_earnings)
    .bind(&order.delivery_address)
    .bind(order.delivery_point.lat)
    .bind(order.delivery_point.lng)
    .bind(&order.delivery_block)
    .bind(&order.delivery_dorm)
    .bind(&order.customer_phone)
    .bind(&order.customer_id_number)
    .bind(&order.special_instructions)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    for item in &order.items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, menu_item_id, quantity, unit_price, subtotal, special_instructions)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(item.menu_item_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .bind(&item.special_instructions)
        .execute(&mut *conn)
        .await?;
    }
    sqlx::query(
        r#"
            INSERT INTO payments (order_id, amount, payment_method, payment_status, transaction_id, created_at)
            VALUES ($1, $2, $3, 'pending', $4, $5)
        "#,
    )
    .bind(id)
    .bind(order.total_amount)
    .bind(order.payment_method)
    .bind(&order.transaction_id)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;
    debug!("🗃️ Order [{}] inserted with id {id} and {} items", order.order_number, order.items.len());
    Ok(id)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(number: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_number = $1").bind(number).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await?;
    Ok(items)
}

pub async fn fetch_payment(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(payment)
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(id) = query.student_id {
        where_clause.push("student_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(id) = query.vendor_id {
        where_clause.push("vendor_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(id) = query.rider_id {
        where_clause.push("assigned_rider_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if query.unassigned {
        where_clause.push("assigned_rider_id IS NULL");
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        let statuses = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset.unwrap_or(0));
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

fn timestamp_column(status: OrderStatusType) -> Option<&'static str> {
    match status {
        OrderStatusType::Pending => None,
        OrderStatusType::Confirmed => Some("confirmed_at"),
        OrderStatusType::Preparing => Some("prepared_at"),
        OrderStatusType::Ready => Some("ready_at"),
        OrderStatusType::PickedUp => Some("picked_up_at"),
        OrderStatusType::Delivered => Some("delivered_at"),
        OrderStatusType::Cancelled | OrderStatusType::Rejected => Some("cancelled_at"),
    }
}

/// Moves the order to `change.to`, provided its status is still `change.from` and, for changes made on behalf of a
/// rider, that rider is still the assignee. Stamps the matching timestamp column and stores the reason, if the change
/// carries one.
///
/// Returns `false` if no row matched, i.e. the order does not exist or another request changed it first.
pub async fn update_status(change: &StatusChange, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let stamp = timestamp_column(change.to).map(|col| format!(", {col} = $2")).unwrap_or_default();
    let assignee = if change.assignee.is_some() { " AND assigned_rider_id = $6" } else { "" };
    let sql = format!(
        "UPDATE orders SET status = $1, updated_at = $2{stamp}, cancellation_reason = COALESCE($3, \
         cancellation_reason) WHERE id = $4 AND status = $5{assignee}"
    );
    let mut query = sqlx::query(&sql)
        .bind(change.to)
        .bind(change.timestamp)
        .bind(&change.reason)
        .bind(change.order_id)
        .bind(change.from);
    if let Some(rider_id) = change.assignee {
        query = query.bind(rider_id);
    }
    let result = query.execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Attaches the rider to the order if the order is unassigned and in the status the mode requires.
/// `ConfirmOnAssign` also moves the order to `confirmed`.
pub async fn assign_rider(
    order_id: i64,
    rider_id: i64,
    mode: AssignmentMode,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let confirm = match mode {
        AssignmentMode::PreAssign => "",
        AssignmentMode::ConfirmOnAssign => ", status = 'confirmed', confirmed_at = $2",
    };
    let sql = format!(
        "UPDATE orders SET assigned_rider_id = $1, updated_at = $2{confirm} WHERE id = $3 AND status = $4 AND \
         assigned_rider_id IS NULL"
    );
    let result = sqlx::query(&sql)
        .bind(rider_id)
        .bind(at)
        .bind(order_id)
        .bind(mode.required_status())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Detaches the rider from the order, if it is the assignee and has not yet picked the order up.
pub async fn clear_assignment(
    order_id: i64,
    rider_id: i64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE orders SET assigned_rider_id = NULL, updated_at = $1 WHERE id = $2 AND assigned_rider_id = $3 AND \
         status IN {RELEASABLE_STATUSES}"
    );
    let result = sqlx::query(&sql).bind(at).bind(order_id).bind(rider_id).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}
