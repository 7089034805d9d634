use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{NewReview, Review};

/// Inserts the review. Fails with a UNIQUE violation if the order has already been reviewed.
pub async fn insert_review(review: NewReview, conn: &mut SqliteConnection) -> Result<Review, sqlx::Error> {
    let id = sqlx::query(
        r#"
            INSERT INTO reviews (order_id, student_id, vendor_id, rider_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(review.order_id)
    .bind(review.student_id)
    .bind(review.vendor_id)
    .bind(review.rider_id)
    .bind(review.rating)
    .bind(review.comment)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    let review = sqlx::query_as("SELECT * FROM reviews WHERE id = $1").bind(id).fetch_one(conn).await?;
    Ok(review)
}

pub async fn fetch_review_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Review>, sqlx::Error> {
    let review =
        sqlx::query_as("SELECT * FROM reviews WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(review)
}
