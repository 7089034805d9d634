use sqlx::SqliteConnection;

use crate::db_types::{MenuItem, NewMenuItem};

pub async fn insert_menu_item(item: NewMenuItem, conn: &mut SqliteConnection) -> Result<MenuItem, sqlx::Error> {
    let id = sqlx::query(
        r#"
            INSERT INTO menu_items (vendor_id, name, price, discount_price, is_available)
            VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(item.vendor_id)
    .bind(item.name)
    .bind(item.price)
    .bind(item.discount_price)
    .bind(item.is_available)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    let item = sqlx::query_as("SELECT * FROM menu_items WHERE id = $1").bind(id).fetch_one(conn).await?;
    Ok(item)
}

pub async fn fetch_menu_item(id: i64, conn: &mut SqliteConnection) -> Result<Option<MenuItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM menu_items WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(item)
}

pub async fn set_available(
    id: i64,
    is_available: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<MenuItem>, sqlx::Error> {
    let result = sqlx::query("UPDATE menu_items SET is_available = $1 WHERE id = $2")
        .bind(is_available)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_menu_item(id, conn).await
}
