//! # SQLite backend
//!
//! Low-level SQLite interactions are kept as plain functions that accept a `&mut SqliteConnection`. Callers obtain a
//! connection from the pool, or open a transaction and pass `&mut tx`, without changing the functions themselves.
//!
//! Transactions always start with their conditional write. SQLite only allows one writer at a time, so once that
//! first write has succeeded the transaction can read what it depends on without another writer slipping in.
mod errors;
mod sqlite_impl;

pub mod menu_items;
pub mod notifications;
pub mod orders;
pub mod reviews;
pub mod riders;
pub mod students;
pub mod vendors;

use std::{env, str::FromStr, time::Duration};

pub use errors::is_unique_violation;
use log::info;
pub use sqlite_impl::SqliteDatabase;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

const SQLITE_DB_URL: &str = "sqlite://data/dispatch.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

pub fn db_url() -> String {
    let result = env::var("DISPATCH_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ DISPATCH_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

/// Opens a pool in WAL mode. Writers that find the database locked wait for up to 30 seconds rather than failing.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
