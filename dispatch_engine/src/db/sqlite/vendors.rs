use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{Money, NewVendor, Vendor};

pub async fn insert_vendor(vendor: NewVendor, conn: &mut SqliteConnection) -> Result<Vendor, sqlx::Error> {
    let now = Utc::now();
    let id = sqlx::query(
        r#"
            INSERT INTO vendors (business_name, is_open, commission_rate, minimum_order, latitude, longitude,
            created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        "#,
    )
    .bind(vendor.business_name)
    .bind(vendor.is_open)
    .bind(vendor.commission_rate)
    .bind(vendor.minimum_order)
    .bind(vendor.location.map(|c| c.lat))
    .bind(vendor.location.map(|c| c.lng))
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    let vendor = sqlx::query_as("SELECT * FROM vendors WHERE id = $1").bind(id).fetch_one(conn).await?;
    Ok(vendor)
}

pub async fn fetch_vendor(id: i64, conn: &mut SqliteConnection) -> Result<Option<Vendor>, sqlx::Error> {
    let vendor = sqlx::query_as("SELECT * FROM vendors WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(vendor)
}

pub async fn set_open(id: i64, is_open: bool, conn: &mut SqliteConnection) -> Result<Option<Vendor>, sqlx::Error> {
    let result = sqlx::query("UPDATE vendors SET is_open = $1, updated_at = $2 WHERE id = $3")
        .bind(is_open)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_vendor(id, conn).await
}

/// Credits the vendor with a delivered order: one more order, the subtotal as revenue and the vendor's share as
/// earnings and balance.
pub async fn credit_delivered_order(
    id: i64,
    revenue: Money,
    earnings: Money,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let Some(vendor) = fetch_vendor(id, &mut *conn).await? else {
        return Ok(());
    };
    sqlx::query(
        r#"
            UPDATE vendors SET total_orders = total_orders + 1, total_revenue = $1, total_earnings = $2,
            current_balance = $3, updated_at = $4 WHERE id = $5
        "#,
    )
    .bind(vendor.total_revenue + revenue)
    .bind(vendor.total_earnings + earnings)
    .bind(vendor.current_balance + earnings)
    .bind(at)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn refresh_rating(id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE vendors SET
                rating = COALESCE((SELECT AVG(rating) FROM reviews WHERE vendor_id = $1), 0.0),
                review_count = (SELECT COUNT(*) FROM reviews WHERE vendor_id = $1)
            WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}
