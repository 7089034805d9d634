use sqlx::SqliteConnection;

use crate::{db_types::NotificationRecord, events::NotificationEvent};

pub async fn insert_notification(
    event: &NotificationEvent,
    conn: &mut SqliteConnection,
) -> Result<NotificationRecord, sqlx::Error> {
    let n = &event.notification;
    let id = sqlx::query(
        r#"
            INSERT INTO notifications (recipient_kind, recipient_id, title, body, category, reference_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(n.recipient.kind())
    .bind(n.recipient.id())
    .bind(&n.title)
    .bind(&n.body)
    .bind(n.category.as_str())
    .bind(&n.reference_id)
    .bind(event.created_at)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    let record = sqlx::query_as("SELECT * FROM notifications WHERE id = $1").bind(id).fetch_one(conn).await?;
    Ok(record)
}

/// Notifications for a recipient, newest first. Pass `None` as the id for the admin channel.
pub async fn fetch_notifications(
    recipient_kind: &str,
    recipient_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Vec<NotificationRecord>, sqlx::Error> {
    let records = sqlx::query_as(
        r#"
            SELECT * FROM notifications WHERE recipient_kind = $1 AND recipient_id IS $2
            ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(recipient_kind)
    .bind(recipient_id)
    .fetch_all(conn)
    .await?;
    Ok(records)
}
