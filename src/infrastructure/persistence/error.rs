use std::error::Error;
use std::fmt;

/// Substring the MySQL driver puts in the error message when a transaction
/// is chosen as a deadlock victim.
pub const DEADLOCK_DB_ERROR_MESSAGE: &str = "Deadlock found";

/// Error type for database operations
#[derive(Debug)]
pub enum DbError {
    /// Error from SeaORM
    SeaOrmError(sea_orm::DbErr),
    /// Connection error
    ConnectionError(String),
    /// Query error
    QueryError(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::SeaOrmError(e) => write!(f, "Database error: {}", e),
            DbError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            DbError::QueryError(msg) => write!(f, "Query error: {}", msg),
        }
    }
}

impl Error for DbError {}

impl From<sea_orm::DbErr> for DbError {
    fn from(err: sea_orm::DbErr) -> Self {
        DbError::SeaOrmError(err)
    }
}

/// Single point of deadlock classification: every retry decision goes
/// through this predicate rather than matching driver messages ad hoc.
pub fn is_deadlock<E: fmt::Display>(err: &E) -> bool {
    err.to_string().contains(DEADLOCK_DB_ERROR_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_deadlock_message_is_classified() {
        let err = DbError::QueryError(
            "Deadlock found when trying to get lock; try restarting transaction".to_string(),
        );
        assert!(is_deadlock(&err));
    }

    #[test]
    fn other_failures_are_not_deadlocks() {
        let timeout = DbError::QueryError("Lock wait timeout exceeded".to_string());
        assert!(!is_deadlock(&timeout));

        let conn = DbError::ConnectionError("connection refused".to_string());
        assert!(!is_deadlock(&conn));
    }
}
