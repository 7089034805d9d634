use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::orders::ACTIVE_STATUSES,
    db_types::{Coordinates, Money, NewRider, Rider},
};

pub async fn insert_rider(rider: NewRider, conn: &mut SqliteConnection) -> Result<Rider, sqlx::Error> {
    let now = Utc::now();
    let location_update = rider.location.map(|_| now);
    let id = sqlx::query(
        r#"
            INSERT INTO riders (name, is_available, current_lat, current_lng, last_location_update, created_at,
            updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
        "#,
    )
    .bind(rider.name)
    .bind(rider.is_available)
    .bind(rider.location.map(|c| c.lat))
    .bind(rider.location.map(|c| c.lng))
    .bind(location_update)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    let rider = sqlx::query_as("SELECT * FROM riders WHERE id = $1").bind(id).fetch_one(conn).await?;
    Ok(rider)
}

pub async fn fetch_rider(id: i64, conn: &mut SqliteConnection) -> Result<Option<Rider>, sqlx::Error> {
    let rider = sqlx::query_as("SELECT * FROM riders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(rider)
}

pub async fn fetch_available_riders(conn: &mut SqliteConnection) -> Result<Vec<Rider>, sqlx::Error> {
    let riders = sqlx::query_as("SELECT * FROM riders WHERE is_available = 1 ORDER BY id").fetch_all(conn).await?;
    Ok(riders)
}

/// Marks the rider unavailable, provided it is currently available. Returns whether the flag changed.
pub async fn reserve_rider(id: i64, at: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE riders SET is_available = 0, updated_at = $1 WHERE id = $2 AND is_available = 1")
        .bind(at)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Marks the rider available, provided it is unavailable and holds no active order. Returns whether the flag changed.
pub async fn release_rider(id: i64, at: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE riders SET is_available = 1, updated_at = $1 WHERE id = $2 AND is_available = 0 AND NOT EXISTS \
         (SELECT 1 FROM orders WHERE assigned_rider_id = $2 AND status IN {ACTIVE_STATUSES})"
    );
    let result = sqlx::query(&sql).bind(at).bind(id).execute(conn).await?;
    debug!("🗃️ Release of rider #{id}: {} row(s) changed", result.rows_affected());
    Ok(result.rows_affected() == 1)
}

/// Flips the availability flag in one conditional write. Going from unavailable to available is skipped while the
/// rider holds an active order, in which case `None` is returned.
///
/// No `RETURNING` here: an unfinished `RETURNING` statement keeps the write hidden from other pool connections.
pub async fn toggle_availability(
    id: i64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Rider>, sqlx::Error> {
    let sql = format!(
        "UPDATE riders SET is_available = NOT is_available, updated_at = $1 WHERE id = $2 AND (is_available = 1 OR \
         NOT EXISTS (SELECT 1 FROM orders WHERE assigned_rider_id = $2 AND status IN {ACTIVE_STATUSES}))"
    );
    let result = sqlx::query(&sql).bind(at).bind(id).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_rider(id, conn).await
}

/// True if the rider is the assignee of any non-terminal order.
pub async fn has_active_order(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM orders WHERE assigned_rider_id = $1 AND status IN {ACTIVE_STATUSES}");
    let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(conn).await?;
    Ok(count > 0)
}

pub async fn update_location(
    id: i64,
    location: Coordinates,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Rider>, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE riders SET current_lat = $1, current_lng = $2, last_location_update = $3, updated_at = $3
            WHERE id = $4
        "#,
    )
    .bind(location.lat)
    .bind(location.lng)
    .bind(at)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_rider(id, conn).await
}

/// Adds a completed delivery and its earnings to the rider's totals and balance.
pub async fn credit_delivery(
    id: i64,
    earnings: Money,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let Some(rider) = fetch_rider(id, &mut *conn).await? else {
        return Ok(());
    };
    sqlx::query(
        r#"
            UPDATE riders SET total_deliveries = total_deliveries + 1, total_earnings = $1, current_balance = $2,
            updated_at = $3 WHERE id = $4
        "#,
    )
    .bind(rider.total_earnings + earnings)
    .bind(rider.current_balance + earnings)
    .bind(at)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Recomputes the rider's average rating and review count from the reviews table.
pub async fn refresh_rating(id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE riders SET
                rating = COALESCE((SELECT AVG(rating) FROM reviews WHERE rider_id = $1), 0.0),
                review_count = (SELECT COUNT(*) FROM reviews WHERE rider_id = $1)
            WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}
