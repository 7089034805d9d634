use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{Money, Student};

pub async fn insert_student(
    full_name: &str,
    phone: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Student, sqlx::Error> {
    let id = sqlx::query("INSERT INTO students (full_name, phone, created_at, updated_at) VALUES ($1, $2, $3, $3)")
        .bind(full_name)
        .bind(phone)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    let student = sqlx::query_as("SELECT * FROM students WHERE id = $1").bind(id).fetch_one(conn).await?;
    Ok(student)
}

pub async fn fetch_student(id: i64, conn: &mut SqliteConnection) -> Result<Option<Student>, sqlx::Error> {
    let student = sqlx::query_as("SELECT * FROM students WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(student)
}

pub async fn credit_delivered_order(
    id: i64,
    amount: Money,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let Some(student) = fetch_student(id, &mut *conn).await? else {
        return Ok(());
    };
    sqlx::query("UPDATE students SET total_orders = total_orders + 1, total_spent = $1, updated_at = $2 WHERE id = $3")
        .bind(student.total_spent + amount)
        .bind(at)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
