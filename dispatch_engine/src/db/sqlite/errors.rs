use crate::traits::DeliveryDatabaseError;

impl From<sqlx::Error> for DeliveryDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        DeliveryDatabaseError::DatabaseError(e.to_string())
    }
}

/// True if the error is a UNIQUE constraint violation.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
